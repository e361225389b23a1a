//! Generate command implementation
//!
//! The generate command drives the external code generator across every
//! selected `(language, version)` pair:
//!
//! 1. Assemble the full spec for each selected version (plus per-language
//!    specs for languages overriding their sections).
//! 2. Probe and memoize the generator version; a failed probe is fatal
//!    before any per-language work starts.
//! 3. Verify processed templates exist for every pair that configures them
//!    (unless running with the generator's builtin templates).
//! 4. For each pair: optionally delete previously generated files matching
//!    the repo's blacklist, run the generation commands (the configured ones,
//!    or a synthesized default generator invocation), render downstream
//!    templates, and update the `.apigentools-info` marker.
//!
//! Unlike test/validate/push, generation aborts on the first failing pair:
//! downstream pairs frequently depend on shared state the failed one was
//! supposed to produce.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Result;
use clap::Args;
use log::{error, info, Level};
use regex::Regex;
use walkdir::WalkDir;

use crate::commands::Context;
use crate::config::{ContainerOpts, LanguageConfig, TemplatedCommand, Token};
use crate::defaults::GENERATED_FILES_BLACKLIST;
use crate::error::Error;
use crate::exec::{run_command, run_config_command, CmdPart, FunctionRegistry};
use crate::template;
use crate::{cli::GlobalArgs, git, info_file};

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Additional components recorded in code stamps
    #[arg(
        long = "additional-stamp",
        value_name = "STAMP",
        env = "APIGENTOOLS_ADDITIONAL_STAMP",
        value_delimiter = ':'
    )]
    pub additional_stamp: Vec<String>,

    /// Image apigentools itself runs in, recorded in code stamps
    #[arg(long, value_name = "IMAGE", env = "APIGENTOOLS_IMAGE")]
    pub generated_with_image: Option<String>,

    /// Use the generator's builtin templates instead of processed ones
    #[arg(long, env = "APIGENTOOLS_BUILTIN_TEMPLATES")]
    pub builtin_templates: bool,

    /// Delete files matching the .generated_files patterns before generating
    #[arg(long, env = "APIGENTOOLS_CLEAN_GENERATED")]
    pub clean_generated: bool,
}

/// Memoized probe of the external generator's version.
///
/// Owned by the command invocation rather than stored in any global state;
/// the probe runs at most once per invocation.
#[derive(Default)]
struct CodegenVersionCache {
    cached: Option<Option<String>>,
}

impl CodegenVersionCache {
    fn get(&mut self, codegen_exec: &str) -> Option<String> {
        if let Some(cached) = &self.cached {
            return cached.clone();
        }
        let parts = vec![CmdPart::plain(codegen_exec), CmdPart::plain("version")];
        let probed = run_command(
            &parts,
            "probe codegen version",
            Path::new("."),
            &BTreeMap::new(),
            Level::Debug,
            false,
        )
        .ok()
        .map(|output| output.stdout.trim().to_string());
        self.cached = Some(probed.clone());
        probed
    }
}

/// Build the provenance stamp embedded into generated code.
fn build_stamp(
    tool_version: &str,
    generated_with_image: Option<&str>,
    spec_repo_commit: Option<&str>,
    codegen_version: Option<&str>,
    additional: &[String],
) -> String {
    let run_kind = match generated_with_image {
        Some(image) => format!(" (image: '{}')", image),
        None => " (non-container run)".to_string(),
    };
    let mut parts = vec![format!(
        "Generated with: apigentools version {}{}",
        tool_version, run_kind
    )];
    if let Some(commit) = spec_repo_commit {
        parts.push(format!("spec repo commit {}", commit));
    }
    if let Some(version) = codegen_version {
        parts.push(format!("codegen version {}", version));
    }
    parts.extend(additional.iter().cloned());
    parts.join("; ")
}

/// Extract the package version from a per-language generator config, used
/// for the generated user-agent header.
fn version_from_oapi_config(config: &serde_json::Value) -> crate::error::Result<String> {
    for key in ["packageVersion", "artifactVersion"] {
        if let Some(version) = config.get(key).and_then(|v| v.as_str()) {
            return Ok(version.to_string());
        }
    }
    Err(Error::ConfigParse {
        message: "no package version found in language config".to_string(),
        hint: Some("set packageVersion or artifactVersion".to_string()),
    })
}

/// The default generator invocation, used when a generation configures no
/// commands of its own and injectable into configured commands as the
/// `generate` function.
#[allow(clippy::too_many_arguments)]
fn default_generate_invocation(
    codegen_exec: &str,
    user_agent_client_name: &str,
    package_version: &str,
    language: &str,
    language_config: &str,
    full_spec_path: &str,
    templates_dir: Option<&str>,
    stamp: &str,
) -> Vec<String> {
    let mut invocation = vec![
        codegen_exec.to_string(),
        "generate".to_string(),
        "--http-user-agent".to_string(),
        format!(
            "{}/{}/{}",
            user_agent_client_name, package_version, language
        ),
        "-g".to_string(),
        language.to_string(),
        "-c".to_string(),
        language_config.to_string(),
        "-i".to_string(),
        full_spec_path.to_string(),
        "-o".to_string(),
        ".".to_string(),
        "--additional-properties".to_string(),
        format!("apigentoolsStamp='{}'", stamp),
    ];
    if let Some(templates_dir) = templates_dir {
        invocation.push("-t".to_string());
        invocation.push(templates_dir.to_string());
    }
    invocation
}

/// Delete previously generated files matching the repo's blacklist patterns.
fn clean_generated_files(generated_lang_dir: &Path) -> crate::error::Result<()> {
    let blacklist_path = generated_lang_dir.join(GENERATED_FILES_BLACKLIST);
    if !blacklist_path.exists() {
        return Ok(());
    }
    let mut patterns = Vec::new();
    for line in std::fs::read_to_string(&blacklist_path)?.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        patterns.push(Regex::new(line)?);
    }

    let mut to_delete = Vec::new();
    for entry in WalkDir::new(generated_lang_dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(generated_lang_dir)
            .unwrap_or_else(|_| entry.path());
        let relative = relative.to_string_lossy();
        if patterns.iter().any(|p| p.is_match(&relative)) {
            to_delete.push(entry.path().to_path_buf());
        }
    }
    for path in to_delete {
        info!("Removing previously generated {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Render the language's downstream templates directly into its generated
/// repository, without invoking the external generator.
fn render_downstream_templates(
    ctx: &Context,
    language: &LanguageConfig,
    vars: &BTreeMap<String, String>,
) -> crate::error::Result<()> {
    if language.downstream_templates.is_empty() {
        return Ok(());
    }
    info!("Rendering downstream templates ...");
    let generated_dir = language.generated_lang_dir(&ctx.generated_code_dir());
    for (template_path, destination) in &language.downstream_templates {
        let source = ctx.global.spec_repo_dir.join(template_path);
        let target = generated_dir.join(destination);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Writing {}", target.display());
        let content = std::fs::read_to_string(&source)?;
        std::fs::write(&target, template::render(&content, vars))?;
    }
    Ok(())
}

/// Pairs whose configured templates are missing from the template dir.
fn missing_templates(ctx: &Context, pairs: &[(String, String)]) -> Vec<String> {
    let mut missing = Vec::new();
    for (language, version) in pairs {
        let Ok(language_config) = ctx.config.get_language_config(language) else {
            continue;
        };
        if language_config.templates_config_for(version).is_none() {
            continue;
        }
        let templates = ctx.template_dir().join(language).join(version);
        if !templates.exists() {
            missing.push(format!("{}/{}", language, version));
        }
    }
    missing
}

/// Execute the generate command
pub fn execute(global: &GlobalArgs, args: GenerateArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let versions = ctx.selected_versions()?;
    let pairs = ctx.pairs()?;

    // full specs for all selected versions first
    crate::commands::assemble_full_specs(&ctx, &versions, &pairs)?;

    let mut codegen_cache = CodegenVersionCache::default();
    let codegen_version = codegen_cache.get(&ctx.config.codegen_exec);
    if codegen_version.is_none() {
        error!("Failed to get codegen version, exiting");
        return Ok(1);
    }

    if !args.builtin_templates {
        let missing = missing_templates(&ctx, &pairs);
        if !missing.is_empty() {
            error!(
                "Missing templates for {}; please run `apigentools templates` first",
                missing.join(", ")
            );
            return Ok(1);
        }
    }

    let spec_repo_commit = git::get_current_commit(&ctx.global.spec_repo_dir);
    let stamp = build_stamp(
        env!("CARGO_PKG_VERSION"),
        args.generated_with_image.as_deref(),
        spec_repo_commit.as_deref(),
        codegen_version.as_deref(),
        &args.additional_stamp,
    );

    if args.clean_generated {
        let mut cleaned = BTreeSet::new();
        for (language, _) in &pairs {
            if cleaned.insert(language.clone()) {
                let language_config = ctx.config.get_language_config(language)?;
                clean_generated_files(
                    &language_config.generated_lang_dir(&ctx.generated_code_dir()),
                )?;
            }
        }
    }

    for (language, version) in &pairs {
        info!("Generation in {}, spec version {}", language, version);
        let language_config = ctx.config.get_language_config(language)?;

        let oapi_config_path = ctx.language_oapi_config_path(language, version);
        let oapi_config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&oapi_config_path)?)?;
        let package_version = version_from_oapi_config(&oapi_config)?;

        let output_dir = ctx.version_output_dir(language_config, version);
        std::fs::create_dir_all(&output_dir)?;

        let mut vars = ctx.version_vars(language_config, version);
        vars.insert("stamp".to_string(), stamp.clone());

        let mut registry = FunctionRegistry::builtin();
        let invocation = default_generate_invocation(
            &ctx.config.codegen_exec,
            &ctx.config.user_agent_client_name,
            &package_version,
            language,
            &vars["language_config"],
            &vars["full_spec_path"],
            (!args.builtin_templates).then(|| vars["templates_dir"].as_str()),
            &stamp,
        );
        registry.register(
            "generate",
            Box::new(move |_cwd, _args, _kwargs| Ok(invocation.clone())),
        );

        let configured = language_config.commands_for(version);
        let synthesized;
        let commands: &[TemplatedCommand] = if configured.is_empty() {
            synthesized = [default_generate_command(
                language_config.container_opts_for(version).clone(),
            )];
            &synthesized
        } else {
            configured
        };

        for command in commands {
            run_config_command(
                command,
                &format!("{}-{}", language, version),
                &output_dir,
                &vars,
                &registry,
                &BTreeMap::new(),
                &ctx.exec_options(),
            )?;
        }

        render_downstream_templates(&ctx, language_config, &vars)?;

        let record = info_file::RegenerationRecord::now(
            env!("CARGO_PKG_VERSION"),
            spec_repo_commit.clone(),
            codegen_version.clone(),
            args.generated_with_image.clone(),
            args.additional_stamp.clone(),
        );
        info_file::update_info_file(
            &language_config.generated_lang_dir(&ctx.generated_code_dir()),
            version,
            &record,
        )?;
    }

    Ok(0)
}

fn default_generate_command(container_opts: ContainerOpts) -> TemplatedCommand {
    TemplatedCommand {
        description: "Generate code using openapi-generator".to_string(),
        commandline: vec![Token::Call {
            function: "generate".to_string(),
            args: vec![],
            kwargs: BTreeMap::new(),
        }],
        container_opts: Some(container_opts),
    }
}
