//! CLI argument parsing and command dispatch
//!
//! Every flag has an `APIGENTOOLS_*` environment-variable fallback, consumed
//! by clap before argument defaults apply, so CI systems can configure runs
//! entirely through the environment.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::defaults::{
    DEFAULT_CONFIG_DIR, DEFAULT_DOWNSTREAM_TEMPLATES_DIR, DEFAULT_FULL_SPEC_FILE,
    DEFAULT_GENERATED_CODE_DIR, DEFAULT_SPEC_DIR, DEFAULT_TEMPLATES_DIR,
    DEFAULT_TEMPLATE_PATCHES_DIR,
};

/// apigentools - generate multiple OpenAPI client libraries from modular
/// spec fragments
#[derive(Parser, Debug)]
#[command(name = "apigentools")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the spec repository
    #[arg(
        short = 'r',
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_SPEC_REPO_DIR",
        default_value = "."
    )]
    pub spec_repo_dir: PathBuf,

    /// Directory with the apigentools configuration, relative to the spec repo
    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_CONFIG_DIR",
        default_value = DEFAULT_CONFIG_DIR
    )]
    pub config_dir: PathBuf,

    /// Directory with spec fragments, relative to the spec repo
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_SPEC_DIR",
        default_value = DEFAULT_SPEC_DIR
    )]
    pub spec_dir: PathBuf,

    /// Directory generated client code is written to
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_GENERATED_CODE_DIR",
        default_value = DEFAULT_GENERATED_CODE_DIR
    )]
    pub generated_code_dir: PathBuf,

    /// Directory with processed upstream templates
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_TEMPLATES_DIR",
        default_value = DEFAULT_TEMPLATES_DIR
    )]
    pub template_dir: PathBuf,

    /// Directory with patches applied to upstream templates
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_TEMPLATE_PATCHES_DIR",
        default_value = DEFAULT_TEMPLATE_PATCHES_DIR
    )]
    pub template_patches_dir: PathBuf,

    /// Directory with templates rendered directly into generated repos
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "APIGENTOOLS_DOWNSTREAM_TEMPLATES_DIR",
        default_value = DEFAULT_DOWNSTREAM_TEMPLATES_DIR
    )]
    pub downstream_templates_dir: PathBuf,

    /// Name of the assembled full-spec file inside spec/<version>/
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        env = "APIGENTOOLS_FULL_SPEC_FILE",
        default_value = DEFAULT_FULL_SPEC_FILE
    )]
    pub full_spec_file: String,

    /// Languages to process (defaults to all configured)
    #[arg(
        short = 'L',
        long = "languages",
        global = true,
        value_name = "LANG",
        env = "APIGENTOOLS_LANG",
        value_delimiter = ':'
    )]
    pub languages: Vec<String>,

    /// API versions to process (defaults to all configured)
    #[arg(
        long = "api-versions",
        global = true,
        value_name = "VERSION",
        env = "APIGENTOOLS_API_VERSION",
        value_delimiter = ':'
    )]
    pub api_versions: Vec<String>,

    /// Log what would be executed instead of executing
    #[arg(long, global = true, env = "APIGENTOOLS_DRY_RUN")]
    pub dry_run: bool,

    /// Log debug-level output
    #[arg(short = 'v', long, global = true, env = "APIGENTOOLS_VERBOSE")]
    pub verbose: bool,

    /// Clone and push generated repos via HTTPS instead of SSH
    #[arg(long, global = true, env = "APIGENTOOLS_GIT_VIA_HTTPS")]
    pub git_via_https: bool,

    /// OAuth token to embed in HTTPS clone URLs
    #[arg(
        long,
        global = true,
        value_name = "TOKEN",
        env = "APIGENTOOLS_GIT_VIA_HTTPS_OAUTH_TOKEN"
    )]
    pub git_via_https_oauth_token: Option<String>,

    /// GitHub App installation token to embed in HTTPS clone URLs
    #[arg(
        long,
        global = true,
        value_name = "TOKEN",
        env = "APIGENTOOLS_GIT_VIA_HTTPS_INSTALLATION_ACCESS_TOKEN"
    )]
    pub git_via_https_installation_access_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate client code for all selected languages and API versions
    Generate(commands::generate::GenerateArgs),
    /// Fetch, patch and install upstream generator templates
    Templates(commands::templates::TemplatesArgs),
    /// Assemble full specs and run configured validation commands
    Validate(commands::validate::ValidateArgs),
    /// Run configured test commands against generated code
    Test(commands::test::TestArgs),
    /// Push generated code to per-language git repositories
    Push(commands::push::PushArgs),
    /// Split a single OpenAPI spec file into section fragments
    Split(commands::split::SplitArgs),
    /// Assemble full specs from section fragments
    Merge(commands::merge::MergeArgs),
    /// Scaffold a new spec repository
    Init(commands::init::InitArgs),
    /// Print the resolved configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the selected subcommand, returning the process exit code.
    pub fn execute(self) -> Result<i32> {
        match self.command {
            Commands::Generate(args) => commands::generate::execute(&self.global, args),
            Commands::Templates(args) => commands::templates::execute(&self.global, args),
            Commands::Validate(args) => commands::validate::execute(&self.global, args),
            Commands::Test(args) => commands::test::execute(&self.global, args),
            Commands::Push(args) => commands::push::execute(&self.global, args),
            Commands::Split(args) => commands::split::execute(&self.global, args),
            Commands::Merge(args) => commands::merge::execute(&self.global, args),
            Commands::Init(args) => commands::init::execute(&self.global, args),
            Commands::Config(args) => commands::config::execute(&self.global, args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }

    /// Initialize logging from the `--verbose` flag / `RUST_LOG`.
    pub fn init_logging(&self) {
        let default_level = if self.global.verbose { "debug" } else { "info" };
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(default_level),
        )
        .format_timestamp(None)
        .init();
    }
}
