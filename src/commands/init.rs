//! Init command implementation
//!
//! Scaffolds a new spec repository with the conventional layout this tool
//! expects: a config directory with a starter configuration, a spec
//! directory with a header fragment for the first API version, and the
//! directories templates, patches and generated code live in. Existing
//! files are left untouched, so re-running init in a repo is safe.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use log::{info, Level};

use crate::cli::GlobalArgs;
use crate::defaults::{
    DEFAULT_CONFIG_DIR, DEFAULT_DOWNSTREAM_TEMPLATES_DIR, DEFAULT_GENERATED_CODE_DIR,
    DEFAULT_SPEC_DIR, DEFAULT_TEMPLATES_DIR, DEFAULT_TEMPLATE_PATCHES_DIR, HEADER_FILE_NAME,
    LANGUAGE_CONFIG_DIR, SHARED_SECTION_NAME,
};
use crate::exec::{run_command, CmdPart};

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create the spec repository in
    #[arg(value_name = "DIR")]
    pub projectdir: PathBuf,

    /// Don't initialize a git repository in the project directory
    #[arg(long = "no-git-repo", env = "APIGENTOOLS_INIT_NO_GIT_REPO")]
    pub no_git_repo: bool,
}

const STARTER_CONFIG: &str = r#"codegen_exec: openapi-generator
spec_versions:
  - v1
spec_sections:
  v1:
    - header.yaml
    - shared.yaml
languages: {}
"#;

const STARTER_HEADER: &str = r#"openapi: 3.0.0
info:
  title: My API
  description: Description of My API
  version: 1.0.0
servers:
  - url: https://api.example.com/v1
"#;

const STARTER_SHARED: &str = r#"tags: []
components:
  schemas: {}
"#;

const STARTER_GITIGNORE: &str = r#"generated/
templates/
spec/*/full_spec*.yaml
"#;

fn write_if_missing(path: &Path, content: &str) -> std::io::Result<()> {
    if path.exists() {
        info!("{} already exists, not touching it", path.display());
        return Ok(());
    }
    std::fs::write(path, content)
}

/// Execute the init command
pub fn execute(_global: &GlobalArgs, args: InitArgs) -> Result<i32> {
    let root = &args.projectdir;
    info!("Initializing spec repo in {}", root.display());

    let directories = [
        PathBuf::from(DEFAULT_CONFIG_DIR).join(LANGUAGE_CONFIG_DIR),
        PathBuf::from(DEFAULT_SPEC_DIR).join("v1"),
        PathBuf::from(DEFAULT_TEMPLATE_PATCHES_DIR),
        PathBuf::from(DEFAULT_DOWNSTREAM_TEMPLATES_DIR),
        PathBuf::from(DEFAULT_GENERATED_CODE_DIR),
        PathBuf::from(DEFAULT_TEMPLATES_DIR),
    ];
    for directory in &directories {
        std::fs::create_dir_all(root.join(directory))?;
    }

    write_if_missing(
        &root.join(DEFAULT_CONFIG_DIR).join("config.yaml"),
        STARTER_CONFIG,
    )?;
    let spec_v1 = root.join(DEFAULT_SPEC_DIR).join("v1");
    write_if_missing(&spec_v1.join(HEADER_FILE_NAME), STARTER_HEADER)?;
    write_if_missing(
        &spec_v1.join(format!("{}.yaml", SHARED_SECTION_NAME)),
        STARTER_SHARED,
    )?;
    write_if_missing(&root.join(".gitignore"), STARTER_GITIGNORE)?;

    if !args.no_git_repo {
        run_command(
            &[CmdPart::plain("git"), CmdPart::plain("init")],
            "initialize git repository",
            root,
            &BTreeMap::new(),
            Level::Debug,
            false,
        )?;
    }

    info!("Spec repo initialized");
    Ok(0)
}
