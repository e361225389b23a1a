//! # apigentools Library
//!
//! This library provides the core functionality for generating multiple
//! OpenAPI client libraries from a repository of modular spec fragments. It
//! is designed to be used by the `apigentools` command-line tool but can
//! also be integrated into other applications driving the same workflow.
//!
//! ## Quick Example
//!
//! ```
//! use apigentools::config::Config;
//!
//! let config = Config::parse(r#"
//! spec_versions: [v1]
//! spec_sections:
//!   v1: [header.yaml, users.yaml]
//! languages:
//!   java:
//!     github_repo_name: my-api-client-java
//! "#).unwrap();
//!
//! let java = config.get_language_config("java").unwrap();
//! // languages inherit the global versions and sections unless they override them
//! assert_eq!(java.spec_versions(), ["v1"]);
//! assert_eq!(java.spec_sections_for("v1"), ["header.yaml", "users.yaml"]);
//! ```
//!
//! ## Core Concepts
//!
//! The library is built around a few key components:
//!
//! - **Configuration (`config`)**: The layered configuration model — global
//!   defaults, per-language settings, per-version generations and container
//!   options — resolved once after parsing into concrete, queryable objects.
//! - **Command Execution (`exec`)**: Templated command lines whose tokens
//!   are substituted, expanded through an explicit function registry, and
//!   dispatched either to the host or into a container, with secret values
//!   redacted from all logging and errors.
//! - **Spec Assembly (`assemble`)**: Merging a version's spec fragments into
//!   one full OpenAPI document, failing fast on any cross-fragment
//!   duplicates.
//! - **Provenance (`info_file`, `git`)**: Stamping generated repositories
//!   with tool version, spec-repo commit and regeneration timestamps.
//! - **Workflow commands (`commands`)**: The orchestration steps (generate,
//!   templates, validate, test, push, split, merge, init, config) composed
//!   from the pieces above.
//!
//! ## Execution Flow
//!
//! A typical generation run executes the following high-level steps:
//!
//! 1. Parse and resolve the configuration.
//! 2. Assemble the full spec for every selected API version.
//! 3. For each `(language, version)` pair, run the resolved generation
//!    commands (or the default generator invocation) with a substitution
//!    context describing the pair.
//! 4. Render downstream templates and update each generated repository's
//!    provenance marker.
//!
//! Execution is strictly sequential: pairs and commands run one at a time,
//! in declared order, and the resolved configuration is immutable throughout.

pub mod assemble;
pub mod cli;
pub mod commands;
pub mod config;
pub mod defaults;
pub mod error;
pub mod exec;
pub mod git;
pub mod info_file;
pub mod template;
