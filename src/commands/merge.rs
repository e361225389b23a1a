//! Merge command implementation
//!
//! Assembles the full spec for every selected version (and the per-language
//! variants for languages that override their spec sections) without running
//! any generation. Useful as a standalone workflow step for publishing the
//! assembled documents or feeding them to external tooling.

use anyhow::Result;
use clap::Args;
use log::info;

use crate::cli::GlobalArgs;
use crate::commands::{assemble_full_specs, Context};

/// Arguments for the merge command
#[derive(Args, Debug)]
pub struct MergeArgs {}

/// Execute the merge command
pub fn execute(global: &GlobalArgs, _args: MergeArgs) -> Result<i32> {
    let ctx = Context::load(global)?;
    let versions = ctx.selected_versions()?;
    let pairs = ctx.pairs()?;

    assemble_full_specs(&ctx, &versions, &pairs)?;
    for version in &versions {
        info!(
            "Merged spec version {} into {}",
            version,
            ctx.full_spec_path(version).display()
        );
    }
    Ok(0)
}
