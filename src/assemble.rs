//! # Full-Spec Assembly
//!
//! Combines a version's spec-section fragments into one OpenAPI document.
//!
//! Fragments are meant to be disjoint partitions of a single logical
//! document, so merging is fail-fast: a path, tag, security entry, component
//! or extra top-level key defined by two fragments is an authoring error and
//! aborts the assembly instead of being silently overwritten. Missing
//! section files are equally fatal — every declared section must exist.
//!
//! The output file is only written after every fragment merged cleanly; a
//! failed assembly leaves no partial output behind.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_yaml::{Mapping, Value};

use crate::error::{Error, Result};

/// The component sub-collections an OpenAPI document may carry.
const COMPONENT_COLLECTIONS: [&str; 9] = [
    "schemas",
    "parameters",
    "securitySchemes",
    "requestBodies",
    "responses",
    "headers",
    "examples",
    "links",
    "callbacks",
];

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn empty_accumulator() -> Mapping {
    let mut components = Mapping::new();
    for collection in COMPONENT_COLLECTIONS {
        components.insert(key(collection), Value::Mapping(Mapping::new()));
    }

    let mut accumulator = Mapping::new();
    accumulator.insert(key("paths"), Value::Mapping(Mapping::new()));
    accumulator.insert(key("tags"), Value::Sequence(Vec::new()));
    accumulator.insert(key("components"), Value::Mapping(components));
    accumulator.insert(key("security"), Value::Sequence(Vec::new()));
    accumulator
}

/// Recursively remove every map key present in `filter_keys`, at any depth.
fn strip_filtered_keys(value: &mut Value, filter_keys: &BTreeSet<String>) {
    match value {
        Value::Mapping(mapping) => {
            mapping.retain(|k, _| {
                !k.as_str().map_or(false, |name| filter_keys.contains(name))
            });
            for nested in mapping.values_mut() {
                strip_filtered_keys(nested, filter_keys);
            }
        }
        Value::Sequence(sequence) => {
            for nested in sequence.iter_mut() {
                strip_filtered_keys(nested, filter_keys);
            }
        }
        _ => {}
    }
}

fn describe_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .unwrap_or_else(|_| format!("{:?}", other))
            .trim()
            .to_string(),
    }
}

/// Merge the entries of `source` into the map at `accumulator[collection]`,
/// failing on any key both sides define.
fn merge_map_entries(
    accumulator: &mut Mapping,
    collection_path: &str,
    source: Mapping,
    section: &str,
) -> Result<()> {
    for (entry_key, entry_value) in source {
        if accumulator.contains_key(&entry_key) {
            return Err(Error::DuplicateEntry {
                collection: collection_path.to_string(),
                key: describe_key(&entry_key),
                section: section.to_string(),
            });
        }
        accumulator.insert(entry_key, entry_value);
    }
    Ok(())
}

/// Extend the list at `accumulator[collection]`, failing on values already
/// accumulated from earlier fragments.
fn extend_list_entries(
    accumulator: &mut Vec<Value>,
    collection: &str,
    source: Vec<Value>,
    section: &str,
) -> Result<()> {
    for entry in source {
        if accumulator.contains(&entry) {
            return Err(Error::DuplicateEntry {
                collection: collection.to_string(),
                key: describe_key(&entry),
                section: section.to_string(),
            });
        }
        accumulator.push(entry);
    }
    Ok(())
}

fn as_mapping(value: Value, what: &str, section: &str) -> Result<Mapping> {
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(Error::ConfigParse {
            message: format!("'{}' in spec section '{}' is not a mapping", what, section),
            hint: None,
        }),
    }
}

fn as_sequence(value: Value, what: &str, section: &str) -> Result<Vec<Value>> {
    match value {
        Value::Sequence(sequence) => Ok(sequence),
        Value::Null => Ok(Vec::new()),
        _ => Err(Error::ConfigParse {
            message: format!("'{}' in spec section '{}' is not a list", what, section),
            hint: None,
        }),
    }
}

// Mapping::get_mut with a guaranteed-present key would panic on a logic bug;
// route all accumulator access through these helpers instead.
fn accumulator_mapping<'a>(accumulator: &'a mut Mapping, name: &str) -> &'a mut Mapping {
    let entry = accumulator
        .entry(key(name))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !entry.is_mapping() {
        *entry = Value::Mapping(Mapping::new());
    }
    match entry {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!(),
    }
}

fn accumulator_sequence<'a>(accumulator: &'a mut Mapping, name: &str) -> &'a mut Vec<Value> {
    let entry = accumulator
        .entry(key(name))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if !entry.is_sequence() {
        *entry = Value::Sequence(Vec::new());
    }
    match entry {
        Value::Sequence(sequence) => sequence,
        _ => unreachable!(),
    }
}

fn merge_fragment(accumulator: &mut Mapping, fragment: Mapping, section: &str) -> Result<()> {
    for (fragment_key, fragment_value) in fragment {
        let name = fragment_key.as_str().unwrap_or_default().to_string();
        match name.as_str() {
            "paths" => {
                let paths = as_mapping(fragment_value, "paths", section)?;
                merge_map_entries(
                    accumulator_mapping(accumulator, "paths"),
                    "paths",
                    paths,
                    section,
                )?;
            }
            "tags" => {
                let tags = as_sequence(fragment_value, "tags", section)?;
                extend_list_entries(
                    accumulator_sequence(accumulator, "tags"),
                    "tags",
                    tags,
                    section,
                )?;
            }
            "security" => {
                let security = as_sequence(fragment_value, "security", section)?;
                extend_list_entries(
                    accumulator_sequence(accumulator, "security"),
                    "security",
                    security,
                    section,
                )?;
            }
            "components" => {
                let components = as_mapping(fragment_value, "components", section)?;
                let target = accumulator_mapping(accumulator, "components");
                for (collection_key, collection_value) in components {
                    let collection = collection_key.as_str().unwrap_or_default().to_string();
                    let entries = as_mapping(
                        collection_value,
                        &format!("components.{}", collection),
                        section,
                    )?;
                    merge_map_entries(
                        accumulator_mapping_in(target, &collection),
                        &format!("components.{}", collection),
                        entries,
                        section,
                    )?;
                }
            }
            _ => {
                // document-level keys (info, servers, openapi, ...) may only
                // come from a single fragment
                if accumulator.contains_key(&fragment_key) {
                    return Err(Error::DuplicateEntry {
                        collection: "top-level".to_string(),
                        key: name,
                        section: section.to_string(),
                    });
                }
                accumulator.insert(fragment_key, fragment_value);
            }
        }
    }
    Ok(())
}

fn accumulator_mapping_in<'a>(parent: &'a mut Mapping, name: &str) -> &'a mut Mapping {
    let entry = parent
        .entry(key(name))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !entry.is_mapping() {
        *entry = Value::Mapping(Mapping::new());
    }
    match entry {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!(),
    }
}

fn tag_name(tag: &Value) -> String {
    tag.get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Assemble the spec sections of one version into a full document.
///
/// Sections are read from `spec_dir/<version>/<filename>` in the given
/// order; a missing file fails immediately with
/// [`Error::SpecSectionNotFound`] naming the section and its resolved path.
/// Keys listed in `filter_keys` are stripped recursively from every
/// fragment before merging. Tags are stable-sorted by name after all
/// fragments merged (the conventional ordering OpenAPI tooling expects).
///
/// Returns the path of the written document.
pub fn write_full_spec(
    spec_dir: &Path,
    version: &str,
    section_filenames: &[String],
    output_path: &Path,
    filter_keys: &BTreeSet<String>,
) -> Result<PathBuf> {
    let version_dir = spec_dir.join(version);
    let mut accumulator = empty_accumulator();

    for filename in section_filenames {
        let section_path = version_dir.join(filename);
        if !section_path.exists() {
            return Err(Error::SpecSectionNotFound {
                version: version.to_string(),
                section: filename.clone(),
                path: section_path,
            });
        }
        debug!("Merging spec section {}", section_path.display());
        let content = std::fs::read_to_string(&section_path)?;
        let mut loaded: Value = serde_yaml::from_str(&content)?;
        if !filter_keys.is_empty() {
            strip_filtered_keys(&mut loaded, filter_keys);
        }
        let fragment = as_mapping(loaded, "document", filename)?;
        merge_fragment(&mut accumulator, fragment, filename)?;
    }

    let tags = accumulator_sequence(&mut accumulator, "tags");
    tags.sort_by_key(tag_name);

    let document = Value::Mapping(accumulator);
    std::fs::write(output_path, serde_yaml::to_string(&document)?)?;
    info!("Written full spec to {}", output_path.display());
    Ok(output_path.to_path_buf())
}
