//! Validate command implementation
//!
//! Assembles the full spec for every selected version and runs the resolved
//! validation commands for each `(language, version)` pair (falling back
//! through generation, default generation, language and root, as resolved by
//! the configuration pass). When no language covers a version, the root
//! validation commands run directly so the assembled spec is still checked.
//!
//! Failures accumulate: every pair is validated even when an earlier one
//! fails, and the command exits nonzero if any did.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use log::{debug, error, info};

use crate::cli::GlobalArgs;
use crate::commands::{assemble_full_specs, Context};
use crate::config::{ContainerOpts, TemplatedCommand};
use crate::exec::{run_config_command, FunctionRegistry};

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

fn run_validation_commands(
    ctx: &Context,
    commands: &[TemplatedCommand],
    label: &str,
    vars: &BTreeMap<String, String>,
) -> bool {
    let registry = FunctionRegistry::builtin();
    for command in commands {
        let result = run_config_command(
            command,
            label,
            &ctx.global.spec_repo_dir,
            vars,
            &registry,
            &BTreeMap::new(),
            &ctx.exec_options(),
        );
        if let Err(validation_error) = result {
            error!("Validation failed for {}: {}", label, validation_error);
            return false;
        }
    }
    true
}

/// Execute the validate command
pub fn execute(global: &GlobalArgs, _args: ValidateArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let versions = ctx.selected_versions()?;
    let pairs = ctx.pairs()?;

    assemble_full_specs(&ctx, &versions, &pairs)?;

    let mut failures = 0;

    for (language, version) in &pairs {
        let language_config = ctx.config.get_language_config(language)?;
        let commands = language_config.validation_commands_for(version);
        if commands.is_empty() {
            debug!("No validation commands for {}/{}", language, version);
            continue;
        }
        info!("Validating spec version {} for {}", version, language);
        let vars = ctx.repo_vars(Some(language_config), version);
        if !run_validation_commands(
            &ctx,
            commands,
            &format!("{}-{}", language, version),
            &vars,
        ) {
            failures += 1;
        }
    }

    // versions no selected language covers still get the root validation
    let covered: Vec<&String> = pairs.iter().map(|(_, v)| v).collect();
    let root_opts = ctx.config.container_opts.clone().unwrap_or_default();
    for version in &versions {
        if covered.contains(&version) {
            continue;
        }
        let commands: Vec<TemplatedCommand> = ctx
            .config
            .validation_commands
            .iter()
            .cloned()
            .map(|mut command| {
                command.container_opts =
                    Some(ContainerOpts::resolve(command.container_opts.take(), &root_opts));
                command
            })
            .collect();
        if commands.is_empty() {
            continue;
        }
        info!("Validating spec version {}", version);
        let vars = ctx.repo_vars(None, version);
        if !run_validation_commands(&ctx, &commands, version, &vars) {
            failures += 1;
        }
    }

    if failures > 0 {
        error!("Validation failed for {} spec(s)", failures);
        return Ok(1);
    }
    Ok(0)
}
