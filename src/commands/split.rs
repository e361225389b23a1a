//! Split command implementation
//!
//! Splits a single full OpenAPI document into the section fragments this
//! tool assembles from: paths grouped by top-level endpoint, each fragment
//! carrying the tags and (transitively) referenced schemas its operations
//! use. Tags and schemas used by more than one section move to the `shared`
//! fragment, and document-level keys (`openapi`, `info`, `servers`,
//! remaining component collections, ...) go to the header fragment.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::{info, warn};
use serde_yaml::{Mapping, Value};

use crate::cli::GlobalArgs;
use crate::commands::Context;
use crate::defaults::{HEADER_FILE_NAME, SHARED_SECTION_NAME};
use crate::error::Error;

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// OpenAPI spec file to split
    #[arg(value_name = "FILE")]
    pub input_file: PathBuf,

    /// Version of API that the input spec describes
    #[arg(
        long = "api-version",
        value_name = "VERSION",
        env = "APIGENTOOLS_SPLIT_SPEC_VERSION",
        default_value = "v1"
    )]
    pub api_version: String,
}

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Group endpoints under their most general prefix endpoint, so
/// `/api/v1/user` and `/api/v1/user/{id}` end up in one section.
fn group_endpoints(endpoints: &[String]) -> BTreeMap<String, BTreeSet<String>> {
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for endpoint in endpoints {
        let mut add_endpoint = true;
        for section in groups.keys().cloned().collect::<Vec<_>>() {
            if section.starts_with(endpoint.as_str()) && &section != endpoint {
                // this endpoint is more general; absorb the existing section
                let members = groups.remove(&section).unwrap_or_default();
                let entry = groups.entry(endpoint.clone()).or_default();
                entry.insert(endpoint.clone());
                entry.extend(members);
                add_endpoint = false;
            } else if endpoint.starts_with(section.as_str()) {
                if let Some(members) = groups.get_mut(&section) {
                    members.insert(endpoint.clone());
                }
                add_endpoint = false;
            }
        }
        if add_endpoint {
            groups
                .entry(endpoint.clone())
                .or_default()
                .insert(endpoint.clone());
        }
    }
    groups
}

/// Output file name for a section, e.g. `/api/v1/some-path` → `some_path.yaml`.
fn section_file_name(section: &str) -> crate::error::Result<String> {
    let mut name = section.trim_matches('/').to_string();
    if let Some(stripped) = name.strip_suffix(".yaml") {
        name = stripped.to_string();
    }
    let parts: Vec<&str> = name.splitn(3, '/').collect();
    if parts.len() == 3 && parts[0] == "api" && parts[1].starts_with('v') {
        name = parts[2].to_string();
    }
    let sanitizer = regex::Regex::new("[^0-9a-zA-Z]+")?;
    Ok(format!("{}.yaml", sanitizer.replace_all(&name, "_")))
}

/// Collect schema names referenced anywhere below `value` via `$ref`.
fn collect_refs(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Mapping(mapping) => {
            for (entry_key, entry_value) in mapping {
                if entry_key.as_str() == Some("$ref") {
                    if let Some(reference) = entry_value.as_str() {
                        if let Some(name) = reference.rsplit('/').next() {
                            out.insert(name.to_string());
                        }
                    }
                }
                collect_refs(entry_value, out);
            }
        }
        Value::Sequence(sequence) => {
            for entry in sequence {
                collect_refs(entry, out);
            }
        }
        _ => {}
    }
}

/// Close a set of schema names over schema-to-schema references.
fn close_over_refs(mut names: BTreeSet<String>, schemas: &Mapping) -> BTreeSet<String> {
    let mut worklist: Vec<String> = names.iter().cloned().collect();
    while let Some(name) = worklist.pop() {
        let Some(schema) = schemas.get(key(&name)) else {
            warn!(
                "Schema {} is referenced but has no definition in 'components'",
                name
            );
            continue;
        };
        let mut referenced = BTreeSet::new();
        collect_refs(schema, &mut referenced);
        for reference in referenced {
            if names.insert(reference.clone()) {
                worklist.push(reference);
            }
        }
    }
    names
}

/// Tag names used by the operations of the given path items.
fn collect_tags(paths: &Mapping) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for path_item in paths.values() {
        let Some(operations) = path_item.as_mapping() else {
            continue;
        };
        for operation in operations.values() {
            let Some(operation_tags) = operation.get("tags").and_then(Value::as_sequence)
            else {
                continue;
            };
            for tag in operation_tags {
                if let Some(name) = tag.as_str() {
                    tags.insert(name.to_string());
                }
            }
        }
    }
    tags
}

struct Section {
    paths: Mapping,
    tags: BTreeSet<String>,
    schemas: BTreeSet<String>,
}

/// Split a full spec document into named section fragments.
fn split_spec(mut spec: Mapping) -> crate::error::Result<BTreeMap<String, Mapping>> {
    let paths = match spec.remove(key("paths")) {
        Some(Value::Mapping(paths)) => paths,
        _ => Mapping::new(),
    };
    let all_tags = match spec.remove(key("tags")) {
        Some(Value::Sequence(tags)) => tags,
        _ => Vec::new(),
    };
    let mut components = match spec.remove(key("components")) {
        Some(Value::Mapping(components)) => components,
        _ => Mapping::new(),
    };
    let all_schemas = match components.remove(key("schemas")) {
        Some(Value::Mapping(schemas)) => schemas,
        _ => Mapping::new(),
    };

    let endpoints: Vec<String> = paths
        .keys()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();

    let mut sections: BTreeMap<String, Section> = BTreeMap::new();
    for (group, members) in group_endpoints(&endpoints) {
        let mut section_paths = Mapping::new();
        for member in &members {
            if let Some(path_item) = paths.get(key(member)) {
                section_paths.insert(key(member), path_item.clone());
            }
        }
        let tags = collect_tags(&section_paths);
        let mut referenced = BTreeSet::new();
        collect_refs(&Value::Mapping(section_paths.clone()), &mut referenced);
        let schemas = close_over_refs(referenced, &all_schemas);
        sections.insert(
            group,
            Section {
                paths: section_paths,
                tags,
                schemas,
            },
        );
    }

    // anything used by more than one section moves to the shared fragment
    let mut tag_usage: BTreeMap<&String, usize> = BTreeMap::new();
    let mut schema_usage: BTreeMap<&String, usize> = BTreeMap::new();
    for section in sections.values() {
        for tag in &section.tags {
            *tag_usage.entry(tag).or_default() += 1;
        }
        for schema in &section.schemas {
            *schema_usage.entry(schema).or_default() += 1;
        }
    }
    let shared_tags: BTreeSet<String> = tag_usage
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(name, _)| (*name).clone())
        .collect();
    let shared_schemas: BTreeSet<String> = schema_usage
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(name, _)| (*name).clone())
        .collect();

    let tag_object = |name: &String| -> Value {
        all_tags
            .iter()
            .find(|t| t.get("name").and_then(Value::as_str) == Some(name))
            .cloned()
            .unwrap_or_else(|| {
                let mut tag = Mapping::new();
                tag.insert(key("name"), Value::String(name.clone()));
                Value::Mapping(tag)
            })
    };
    let materialize = |paths: Mapping, tags: &BTreeSet<String>, schemas: &BTreeSet<String>| {
        let mut document = Mapping::new();
        if !paths.is_empty() {
            document.insert(key("paths"), Value::Mapping(paths));
        }
        document.insert(
            key("tags"),
            Value::Sequence(tags.iter().map(tag_object).collect()),
        );
        let mut schema_map = Mapping::new();
        for name in schemas {
            if let Some(schema) = all_schemas.get(key(name)) {
                schema_map.insert(key(name), schema.clone());
            }
        }
        let mut section_components = Mapping::new();
        section_components.insert(key("schemas"), Value::Mapping(schema_map));
        document.insert(key("components"), Value::Mapping(section_components));
        document
    };

    let mut fragments = BTreeMap::new();
    for (group, section) in sections {
        let tags: BTreeSet<String> =
            section.tags.difference(&shared_tags).cloned().collect();
        let schemas: BTreeSet<String> = section
            .schemas
            .difference(&shared_schemas)
            .cloned()
            .collect();
        fragments.insert(
            section_file_name(&group)?,
            materialize(section.paths, &tags, &schemas),
        );
    }
    fragments.insert(
        format!("{}.yaml", SHARED_SECTION_NAME),
        materialize(Mapping::new(), &shared_tags, &shared_schemas),
    );

    // document-level remainder, including non-schema component collections
    let mut header = spec;
    let leftover: Mapping = components
        .into_iter()
        .filter(|(_, collection)| match collection {
            Value::Mapping(mapping) => !mapping.is_empty(),
            _ => false,
        })
        .collect();
    if !leftover.is_empty() {
        header.insert(key("components"), Value::Mapping(leftover));
    }
    fragments.insert(HEADER_FILE_NAME.to_string(), header);

    Ok(fragments)
}

/// Execute the split command
pub fn execute(global: &GlobalArgs, args: SplitArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let content = std::fs::read_to_string(&args.input_file)?;
    let spec: Value = serde_yaml::from_str(&content)?;
    let spec = match spec {
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(Error::ConfigParse {
                message: format!("{} is not an OpenAPI document", args.input_file.display()),
                hint: None,
            }
            .into())
        }
    };

    let fragments = split_spec(spec)?;
    let outdir = ctx.spec_dir().join(&args.api_version);
    std::fs::create_dir_all(&outdir)?;
    let count = fragments.len();
    for (name, fragment) in fragments {
        let path = outdir.join(&name);
        info!("Writing spec section {}", path.display());
        std::fs::write(&path, serde_yaml::to_string(&Value::Mapping(fragment))?)?;
    }
    info!("Split {} into {} sections", args.input_file.display(), count);
    Ok(0)
}
