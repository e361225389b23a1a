//! Config command implementation
//!
//! Prints the configuration after the full resolution pass, either as the
//! list of configured languages or as the whole resolved document. Because
//! loading runs the same validation as every other command, this doubles as
//! a configuration linter.

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::GlobalArgs;
use crate::commands::Context;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// List configured languages
    Languages,
    /// Print the resolved configuration
    Show {
        /// Output format
        #[arg(long, value_parser = ["yaml", "json"], default_value = "yaml")]
        format: String,
    },
}

/// Execute the config command
pub fn execute(global: &GlobalArgs, args: ConfigArgs) -> Result<i32> {
    let ctx = Context::load(global)?;

    match args.action {
        ConfigAction::Languages => {
            for language in ctx.config.language_names() {
                println!("{}", language);
            }
        }
        ConfigAction::Show { format } => {
            let rendered = match format.as_str() {
                "json" => serde_json::to_string_pretty(&ctx.config)?,
                _ => serde_yaml::to_string(&ctx.config)?,
            };
            println!("{}", rendered);
        }
    }
    Ok(0)
}
