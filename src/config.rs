//! # Configuration Schema and Resolution
//!
//! This module defines the data structures that represent the apigentools
//! configuration file, as well as the parsing and resolution logic that turns
//! the raw document into concrete, queryable objects.
//!
//! ## Key Components
//!
//! - **`Config`**: The top-level document: global spec versions and sections,
//!   the codegen executor, default container options, and a map of languages.
//!
//! - **`LanguageConfig`**: Per-language settings, including the per-version
//!   `generation` map, target repository coordinates, and overrides of the
//!   global spec sections and versions.
//!
//! - **`VersionGeneration`**: The per-(language, version) bundle of commands,
//!   tests, validation commands and templates configuration. The `"default"`
//!   map key is a fallback sentinel that concrete versions are synthesized
//!   from when they have no entry of their own.
//!
//! - **`ContainerOpts`**: Execution options (image, environment, workdir,
//!   host-vs-container) that inherit top-down through every level. Fields
//!   are optional in the raw document so that "explicitly set here" remains
//!   distinguishable from "unset, inherit" until the resolution pass runs.
//!
//! - **`TemplatedCommand` / `Token`**: A configured command line whose tokens
//!   are literal strings (with `{{placeholder}}` syntax), secret-marked
//!   literals, or function calls resolved against a registry at execution
//!   time.
//!
//! ## Resolution
//!
//! `Config::from_file` parses the document (YAML or JSON; YAML is a superset)
//! and then runs a single post-processing pass:
//!
//! 1. Every spec version referenced by a language must be declared in the
//!    root `spec_versions` list.
//! 2. Unspecified per-language `spec_sections` entries are filled from the
//!    root's.
//! 3. `container_opts` resolve top-down: root → language → generation →
//!    command. Named versions resolve before the `"default"` generation so
//!    they inherit from the language rather than from an already-resolved
//!    default.
//! 4. Missing `commands`/`tests`/`templates` fall back to the `"default"`
//!    generation; `validation_commands` fall back through default generation,
//!    then language, then root.
//!
//! After this pass the config is read-only; every accessor returns concrete
//! values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_CODEGEN_EXEC, DEFAULT_CONTAINER_IMAGE, OPENAPI_GENERATOR_GIT};
use crate::error::{Error, Result};
use crate::template;

/// Version-label sentinel for the fallback generation entry.
pub const DEFAULT_GENERATION: &str = "default";

fn default_codegen_exec() -> String {
    DEFAULT_CODEGEN_EXEC.to_string()
}

fn default_user_agent_client_name() -> String {
    "OpenAPI".to_string()
}

fn default_version_path_template() -> String {
    "{{spec_version}}".to_string()
}

fn default_command_description() -> String {
    "Generic command".to_string()
}

fn default_generator_git() -> String {
    OPENAPI_GENERATOR_GIT.to_string()
}

/// Container options shared before resolution, used as a safe fallback by
/// accessors so they never have to unwrap.
fn unresolved_opts() -> &'static ContainerOpts {
    static FALLBACK: OnceLock<ContainerOpts> = OnceLock::new();
    FALLBACK.get_or_init(ContainerOpts::default)
}

/// The container image to run a command in: either a literal reference or a
/// build spec meaning "build this image before running".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ImageSource {
    /// Build an image from a Dockerfile and context before running.
    Build { dockerfile: String, context: String },
    /// A literal image reference, e.g. `openjdk:17`.
    Reference(String),
}

/// Execution options for commands, inheritable through every config level.
///
/// All fields default to unset rather than to a concrete value: the
/// inheritance pass must be able to distinguish "the user set this here"
/// from "inherit from the parent level".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContainerOpts {
    /// Environment entries injected into the command. Merged, not replaced,
    /// when inheriting; local keys win on conflict.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Image to run in, or a build spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageSource>,
    /// If false, only `image` is inherited from the parent level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherit: Option<bool>,
    /// If true, the command executes on the host, not in a container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<bool>,
    /// Working directory, relative to the execution root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
}

impl ContainerOpts {
    /// Whether this level inherits from its parent (defaults to true).
    pub fn inherits(&self) -> bool {
        self.inherit.unwrap_or(true)
    }

    /// Whether the command runs on the host rather than in a container.
    pub fn is_system(&self) -> bool {
        self.system.unwrap_or(false)
    }

    /// Working directory relative to the execution root.
    pub fn workdir(&self) -> &str {
        self.workdir.as_deref().unwrap_or(".")
    }

    /// The image to execute in, falling back to the default image constant.
    pub fn image(&self) -> ImageSource {
        self.image
            .clone()
            .unwrap_or_else(|| ImageSource::Reference(DEFAULT_CONTAINER_IMAGE.to_string()))
    }

    /// Merge a child's options against a resolved parent.
    ///
    /// An entirely absent child becomes a copy of the parent. Otherwise, with
    /// `inherit: false` only the image is taken from the parent (and only when
    /// the child didn't set one); with `inherit: true` the environment maps
    /// merge (child wins per key) and unset scalars take the parent's value.
    /// Whatever remains unset afterwards is filled with the hard defaults, so
    /// resolved options always carry a concrete image, `system` and `workdir`.
    pub(crate) fn resolve(child: Option<ContainerOpts>, parent: &ContainerOpts) -> ContainerOpts {
        let mut opts = match child {
            None => parent.clone(),
            Some(mut child) => {
                if child.inherits() {
                    let mut environment = parent.environment.clone();
                    environment.extend(std::mem::take(&mut child.environment));
                    child.environment = environment;
                    if child.system.is_none() {
                        child.system = parent.system;
                    }
                    if child.workdir.is_none() {
                        child.workdir = parent.workdir.clone();
                    }
                    if child.image.is_none() {
                        child.image = parent.image.clone();
                    }
                } else if child.image.is_none() {
                    child.image = parent.image.clone();
                }
                child
            }
        };
        if opts.inherit.is_none() {
            opts.inherit = Some(true);
        }
        if opts.system.is_none() {
            opts.system = Some(false);
        }
        if opts.workdir.is_none() {
            opts.workdir = Some(".".to_string());
        }
        if opts.image.is_none() {
            opts.image = Some(ImageSource::Reference(DEFAULT_CONTAINER_IMAGE.to_string()));
        }
        opts
    }
}

/// One element of a configured command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Token {
    /// A call into the function registry, e.g.
    /// `{"function": "glob", "args": ["src/*.mustache"]}`.
    Call {
        function: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        kwargs: BTreeMap<String, String>,
    },
    /// A literal whose value must never appear in logs or error output,
    /// e.g. `{"item": "https://token@github.com/...", "secret": true}`.
    Secret { item: String, secret: bool },
    /// A literal token; may contain `{{placeholder}}` syntax.
    Literal(String),
}

/// A single configured command line plus its execution options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplatedCommand {
    /// Human-readable description, used for logging.
    #[serde(default = "default_command_description")]
    pub description: String,
    /// Ordered command-line tokens.
    pub commandline: Vec<Token>,
    /// Own override of the owning generation's options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_opts: Option<ContainerOpts>,
}

impl TemplatedCommand {
    /// Resolved execution options for this command.
    pub fn container_opts(&self) -> &ContainerOpts {
        self.container_opts.as_ref().unwrap_or_else(|| unresolved_opts())
    }
}

/// Where upstream templates are fetched from before patching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplatesSource {
    /// Extract templates from a generator jar; the jar itself may first be
    /// copied out of a container image.
    OpenapiJar {
        jar_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        container_image: Option<String>,
        templates_dir: String,
    },
    /// Clone the generator repository at a committish and take templates
    /// from it. Always runs on the host.
    OpenapiGit {
        #[serde(default = "default_generator_git")]
        repo_url: String,
        git_committish: String,
        templates_dir: String,
    },
    /// Copy templates from a local directory.
    Directory {
        directory_path: String,
        templates_dir: String,
    },
}

impl TemplatesSource {
    /// Subpath inside the fetched source selecting the relevant templates.
    pub fn templates_dir(&self) -> &str {
        match self {
            TemplatesSource::OpenapiJar { templates_dir, .. }
            | TemplatesSource::OpenapiGit { templates_dir, .. }
            | TemplatesSource::Directory { templates_dir, .. } => templates_dir,
        }
    }
}

/// Templates configuration for one generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplatesConfig {
    /// Patch files applied to the fetched templates, in listed order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<String>,
    /// Where to fetch upstream templates from.
    pub source: TemplatesSource,
}

/// The per-(language, version) bundle of commands, tests and templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionGeneration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_opts: Option<ContainerOpts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<TemplatedCommand>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<TemplatedCommand>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<TemplatesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_commands: Option<Vec<TemplatedCommand>>,
}

impl VersionGeneration {
    /// Run the inheritance pass for this generation.
    ///
    /// `parent` is the owning language's resolved options; `default_gen` is
    /// the raw (unresolved) `"default"` generation used for command/template
    /// fallback; `fallback_validation` is the language-then-root validation
    /// command chain.
    fn resolve(
        &mut self,
        parent: &ContainerOpts,
        default_gen: Option<&VersionGeneration>,
        fallback_validation: &[TemplatedCommand],
    ) {
        let opts = ContainerOpts::resolve(self.container_opts.take(), parent);
        self.container_opts = Some(opts.clone());

        if self.commands.is_none() {
            self.commands = Some(
                default_gen
                    .and_then(|d| d.commands.clone())
                    .unwrap_or_default(),
            );
        }
        if self.tests.is_none() {
            self.tests = Some(
                default_gen
                    .and_then(|d| d.tests.clone())
                    .unwrap_or_default(),
            );
        }
        if self.templates.is_none() {
            self.templates = default_gen.and_then(|d| d.templates.clone());
        }
        if self.validation_commands.is_none() {
            self.validation_commands = default_gen.and_then(|d| d.validation_commands.clone());
        }
        if self.validation_commands.is_none() {
            self.validation_commands = Some(fallback_validation.to_vec());
        }

        let commands = self
            .commands
            .iter_mut()
            .flatten()
            .chain(self.tests.iter_mut().flatten())
            .chain(self.validation_commands.iter_mut().flatten());
        for command in commands {
            command.container_opts = Some(ContainerOpts::resolve(
                command.container_opts.take(),
                &opts,
            ));
        }
    }

    /// Resolved execution options for this generation.
    pub fn container_opts(&self) -> &ContainerOpts {
        self.container_opts.as_ref().unwrap_or_else(|| unresolved_opts())
    }
}

/// Per-language settings inside [`Config`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageConfig {
    /// Language name; filled from the map key during resolution.
    #[serde(skip)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_org_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_version: Option<String>,
    /// Template producing the per-version output subdirectory.
    #[serde(default = "default_version_path_template")]
    pub version_path_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_opts: Option<ContainerOpts>,
    /// Local template path → destination path, rendered directly into the
    /// generated repo without invoking the external generator.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub downstream_templates: BTreeMap<String, String>,
    /// Per-version override of the global spec sections.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub spec_sections: BTreeMap<String, Vec<String>>,
    /// Subset of the global spec versions this language targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_versions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_commands: Option<Vec<TemplatedCommand>>,
    /// Version label → generation; `"default"` is a fallback sentinel.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub generation: BTreeMap<String, VersionGeneration>,
}

impl LanguageConfig {
    fn resolve(
        &mut self,
        global_versions: &[String],
        global_sections: &BTreeMap<String, Vec<String>>,
        root_opts: &ContainerOpts,
        root_validation: &[TemplatedCommand],
    ) -> Result<()> {
        let versions = self
            .spec_versions
            .get_or_insert_with(|| global_versions.to_vec())
            .clone();

        for version in &versions {
            if !global_versions.contains(version) {
                return Err(Error::VersionNotFound {
                    version: version.clone(),
                    referrer: self.name.clone(),
                });
            }
            if !self.spec_sections.contains_key(version) {
                if let Some(sections) = global_sections.get(version) {
                    self.spec_sections.insert(version.clone(), sections.clone());
                }
            }
        }
        for version in self.spec_sections.keys() {
            if !global_versions.contains(version) {
                return Err(Error::VersionNotFound {
                    version: version.clone(),
                    referrer: format!("{} spec_sections", self.name),
                });
            }
        }

        let lang_opts = ContainerOpts::resolve(self.container_opts.take(), root_opts);
        self.container_opts = Some(lang_opts.clone());

        let fallback_validation = self
            .validation_commands
            .clone()
            .unwrap_or_else(|| root_validation.to_vec());

        // Raw snapshot taken before any generation is resolved: synthesized
        // versions must deep-copy the *unresolved* default entry.
        let default_raw = self.generation.get(DEFAULT_GENERATION).cloned();

        for version in &versions {
            let mut generation = match self.generation.remove(version.as_str()) {
                Some(generation) => generation,
                None => default_raw.clone().unwrap_or_default(),
            };
            generation.resolve(&lang_opts, default_raw.as_ref(), &fallback_validation);
            self.generation.insert(version.clone(), generation);
        }

        // The default generation resolves last: named versions without their
        // own container_opts must inherit from the language, not from an
        // already-resolved default.
        if let Some(mut generation) = self.generation.remove(DEFAULT_GENERATION) {
            generation.resolve(&lang_opts, None, &fallback_validation);
            self.generation.insert(DEFAULT_GENERATION.to_string(), generation);
        }

        Ok(())
    }

    /// Resolved spec versions this language targets.
    pub fn spec_versions(&self) -> &[String] {
        self.spec_versions.as_deref().unwrap_or(&[])
    }

    /// Resolved spec sections for a version; empty if none are declared.
    pub fn spec_sections_for(&self, version: &str) -> &[String] {
        self.spec_sections
            .get(version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The resolved generation bundle for a version.
    pub fn generation_for(&self, version: &str) -> Option<&VersionGeneration> {
        self.generation.get(version)
    }

    /// Generation commands for a version. Never "missing" after resolution:
    /// the version's own commands, the default generation's, or empty.
    pub fn commands_for(&self, version: &str) -> &[TemplatedCommand] {
        self.generation
            .get(version)
            .and_then(|g| g.commands.as_deref())
            .unwrap_or(&[])
    }

    /// Test commands for a version, with the same fallback rule as commands.
    pub fn test_commands_for(&self, version: &str) -> &[TemplatedCommand] {
        self.generation
            .get(version)
            .and_then(|g| g.tests.as_deref())
            .unwrap_or(&[])
    }

    /// Validation commands for a version (generation → default generation →
    /// language → root fallback, baked in during resolution).
    pub fn validation_commands_for(&self, version: &str) -> &[TemplatedCommand] {
        self.generation
            .get(version)
            .and_then(|g| g.validation_commands.as_deref())
            .unwrap_or(&[])
    }

    /// Templates configuration for a version, if any.
    pub fn templates_config_for(&self, version: &str) -> Option<&TemplatesConfig> {
        self.generation
            .get(version)
            .and_then(|g| g.templates.as_ref())
    }

    /// Resolved container options for a version's generation.
    pub fn container_opts_for(&self, version: &str) -> &ContainerOpts {
        self.generation
            .get(version)
            .and_then(|g| g.container_opts.as_ref())
            .or(self.container_opts.as_ref())
            .unwrap_or_else(|| unresolved_opts())
    }

    /// Directory holding this language's generated repository.
    pub fn generated_lang_dir(&self, generated_code_dir: &Path) -> PathBuf {
        generated_code_dir.join(self.github_repo_name.as_deref().unwrap_or(&self.name))
    }

    /// Directory holding generated code for one spec version, rendered from
    /// `version_path_template`.
    pub fn generated_lang_version_dir(
        &self,
        generated_code_dir: &Path,
        version: &str,
    ) -> PathBuf {
        let mut vars = BTreeMap::new();
        vars.insert("spec_version".to_string(), version.to_string());
        self.generated_lang_dir(generated_code_dir)
            .join(template::render(&self.version_path_template, &vars))
    }
}

/// The top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Name or path of the external code generator executable.
    #[serde(default = "default_codegen_exec")]
    pub codegen_exec: String,
    /// Default container options inherited by every language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_opts: Option<ContainerOpts>,
    /// Ordered list of all spec versions this repo maintains.
    #[serde(default)]
    pub spec_versions: Vec<String>,
    /// Version → ordered spec fragment filenames.
    #[serde(default)]
    pub spec_sections: BTreeMap<String, Vec<String>>,
    /// Client name embedded in the generated user-agent header.
    #[serde(default = "default_user_agent_client_name")]
    pub user_agent_client_name: String,
    /// Validation commands run when no language or generation overrides them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_commands: Vec<TemplatedCommand>,
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Config {
    /// Parse a configuration document and run the resolution pass.
    ///
    /// Accepts YAML or JSON (YAML is a superset of JSON, so a single parser
    /// covers both).
    pub fn parse(content: &str) -> Result<Config> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.resolve()?;
        Ok(config)
    }

    /// Load and resolve a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn resolve(&mut self) -> Result<()> {
        let root_opts = ContainerOpts::resolve(self.container_opts.take(), &ContainerOpts::default());
        self.container_opts = Some(root_opts.clone());

        let global_versions = self.spec_versions.clone();
        let global_sections = self.spec_sections.clone();
        let root_validation = self.validation_commands.clone();

        for (name, language) in self.languages.iter_mut() {
            language.name = name.clone();
            language.resolve(&global_versions, &global_sections, &root_opts, &root_validation)?;
        }
        Ok(())
    }

    /// Look up a language's configuration.
    pub fn get_language_config(&self, language: &str) -> Result<&LanguageConfig> {
        self.languages
            .get(language)
            .ok_or_else(|| Error::UnknownLanguage {
                language: language.to_string(),
            })
    }

    /// Global spec sections for a version; an undeclared version yields an
    /// empty list, not an error.
    pub fn spec_sections_for(&self, version: &str) -> &[String] {
        self.spec_sections
            .get(version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of all configured languages, in map order.
    pub fn language_names(&self) -> Vec<String> {
        self.languages.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn opts(
        environment: &[(&str, &str)],
        image: Option<&str>,
        inherit: bool,
        system: bool,
        workdir: &str,
    ) -> ContainerOpts {
        ContainerOpts {
            environment: env(environment),
            image: image.map(|i| ImageSource::Reference(i.to_string())),
            inherit: Some(inherit),
            system: Some(system),
            workdir: Some(workdir.to_string()),
        }
    }

    const SAMPLE: &str = r#"
spec_versions: [v1, v2]
spec_sections: {}
user_agent_client_name: MyClient
validation_commands:
  - commandline: [echo, "1"]
languages:
  java:
    github_repo_name: my-gh-repo
    library_version: "1.0.0"
    spec_versions: [v1, v2]
    version_path_template: "{{spec_version}}"
    container_opts:
      image: "java:image"
      environment:
        LEVEL: "1"
        JAVA: "y"
    generation:
      default:
        container_opts:
          environment:
            LEVEL: "2"
            DEFAULT: "y"
        templates:
          patches: [patch1, patch2]
          source:
            type: openapi-jar
            jar_path: /some/path.jar
            templates_dir: Java
        commands:
          - container_opts:
              environment:
                LEVEL: "3"
                CMD: "y"
            commandline: [some, pre, cmd]
            description: Some pre command
          - commandline: [some, post, cmd]
            description: Some post command
        tests:
          - commandline: [echo, "1"]
          - container_opts:
              environment:
                LEVEL: "3"
            commandline: [echo, "1"]
      v1:
        container_opts:
          image: "other:image"
          inherit: false
          environment:
            LEVEL: "2"
            V1: "y"
        commands:
          - commandline: [v1, pre, cmd]
            description: Some pre command
        validation_commands: []
"#;

    #[test]
    fn test_parse_and_resolve_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.user_agent_client_name, "MyClient");
        assert_eq!(config.codegen_exec, "openapi-generator");

        let java = config.get_language_config("java").unwrap();
        assert_eq!(java.name, "java");
        assert_eq!(
            java.container_opts,
            Some(opts(
                &[("JAVA", "y"), ("LEVEL", "1")],
                Some("java:image"),
                true,
                false,
                "."
            ))
        );
    }

    #[test]
    fn test_unknown_language_is_error() {
        let config = Config::parse(SAMPLE).unwrap();
        assert!(matches!(
            config.get_language_config("cobol"),
            Err(Error::UnknownLanguage { .. })
        ));
    }

    #[test]
    fn test_version_commands_and_default_fallback() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        // v1 has its own commands
        let v1 = java.commands_for("v1");
        assert_eq!(v1.len(), 1);
        assert_eq!(
            v1[0].commandline,
            vec![
                Token::Literal("v1".to_string()),
                Token::Literal("pre".to_string()),
                Token::Literal("cmd".to_string()),
            ]
        );

        // v2 is synthesized from the default generation
        let v2 = java.commands_for("v2");
        assert_eq!(v2.len(), 2);
        assert_eq!(v2[1].commandline[1], Token::Literal("post".to_string()));
    }

    #[test]
    fn test_inherit_false_keeps_own_values() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        assert_eq!(
            java.container_opts_for("v1"),
            &opts(
                &[("LEVEL", "2"), ("V1", "y")],
                Some("other:image"),
                false,
                false,
                "."
            )
        );
    }

    #[test]
    fn test_environment_merge_for_synthesized_version() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        assert_eq!(
            java.container_opts_for("v2"),
            &opts(
                &[("DEFAULT", "y"), ("JAVA", "y"), ("LEVEL", "2")],
                Some("java:image"),
                true,
                false,
                "."
            )
        );
    }

    #[test]
    fn test_command_opts_inherit_from_owning_generation() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        // command inherited from default into v1 picks up v1's opts
        assert_eq!(
            java.commands_for("v1")[0].container_opts(),
            &opts(
                &[("LEVEL", "2"), ("V1", "y")],
                Some("other:image"),
                false,
                false,
                "."
            )
        );
        // command kept on v2 merges its own environment over v2's
        assert_eq!(
            java.commands_for("v2")[0].container_opts(),
            &opts(
                &[("CMD", "y"), ("DEFAULT", "y"), ("JAVA", "y"), ("LEVEL", "3")],
                Some("java:image"),
                true,
                false,
                "."
            )
        );
        assert_eq!(
            java.commands_for("v2")[1].container_opts(),
            &opts(
                &[("DEFAULT", "y"), ("JAVA", "y"), ("LEVEL", "2")],
                Some("java:image"),
                true,
                false,
                "."
            )
        );
    }

    #[test]
    fn test_tests_fall_back_to_default_with_version_opts() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        // tests defined only on default; container_opts must come from v1,
        // not from default
        assert_eq!(
            java.test_commands_for("v1")[0].container_opts(),
            &opts(
                &[("LEVEL", "2"), ("V1", "y")],
                Some("other:image"),
                false,
                false,
                "."
            )
        );
        assert_eq!(
            java.test_commands_for("v1")[1].container_opts(),
            &opts(
                &[("LEVEL", "3"), ("V1", "y")],
                Some("other:image"),
                true,
                false,
                "."
            )
        );
    }

    #[test]
    fn test_validation_commands_three_level_fallback() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        // v1 disables validation explicitly
        assert!(java.validation_commands_for("v1").is_empty());

        // v2 falls back all the way to the root validation commands, with
        // the generation's container opts
        let v2 = java.validation_commands_for("v2");
        assert_eq!(v2.len(), 1);
        assert_eq!(
            v2[0].commandline,
            vec![
                Token::Literal("echo".to_string()),
                Token::Literal("1".to_string())
            ]
        );
        assert_eq!(
            v2[0].container_opts(),
            &opts(
                &[("DEFAULT", "y"), ("JAVA", "y"), ("LEVEL", "2")],
                Some("java:image"),
                true,
                false,
                "."
            )
        );
    }

    #[test]
    fn test_templates_config_shared_from_default() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        let tpl = java.templates_config_for("v1").unwrap();
        assert_eq!(tpl.patches, vec!["patch1", "patch2"]);
        match &tpl.source {
            TemplatesSource::OpenapiJar {
                jar_path,
                templates_dir,
                container_image,
            } => {
                assert_eq!(jar_path, "/some/path.jar");
                assert_eq!(templates_dir, "Java");
                assert!(container_image.is_none());
            }
            other => panic!("expected openapi-jar source, got {:?}", other),
        }
        assert_eq!(
            java.templates_config_for("v1"),
            java.templates_config_for("v2")
        );
    }

    #[test]
    fn test_generated_dirs() {
        let config = Config::parse(SAMPLE).unwrap();
        let java = config.get_language_config("java").unwrap();

        assert_eq!(
            java.generated_lang_dir(Path::new("generated")),
            PathBuf::from("generated/my-gh-repo")
        );
        assert_eq!(
            java.generated_lang_version_dir(Path::new("generated"), "v1"),
            PathBuf::from("generated/my-gh-repo/v1")
        );
    }

    #[test]
    fn test_version_not_found_is_fatal() {
        let content = r#"
spec_versions: [v1]
languages:
  java:
    spec_versions: [v1, v9]
"#;
        match Config::parse(content) {
            Err(Error::VersionNotFound { version, referrer }) => {
                assert_eq!(version, "v9");
                assert_eq!(referrer, "java");
            }
            other => panic!("expected VersionNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_spec_sections_key_must_be_declared_version() {
        let content = r#"
spec_versions: [v1]
languages:
  java:
    spec_versions: [v1]
    spec_sections:
      v9: [x.yaml]
"#;
        assert!(matches!(
            Config::parse(content),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_language_inherits_global_versions_and_sections() {
        let content = r#"
spec_versions: [v1, v2]
spec_sections:
  v1: [x.yaml]
  v2: [y.yaml]
languages:
  java: {}
"#;
        let config = Config::parse(content).unwrap();
        let java = config.get_language_config("java").unwrap();
        assert_eq!(java.spec_versions(), ["v1", "v2"]);
        assert_eq!(java.spec_sections_for("v1"), ["x.yaml"]);
        assert_eq!(java.spec_sections_for("v2"), ["y.yaml"]);
    }

    #[test]
    fn test_language_version_subset() {
        let content = r#"
spec_versions: [v1, v2]
spec_sections:
  v1: [x.yaml]
  v2: [y.yaml]
languages:
  java:
    spec_versions: [v1]
"#;
        let config = Config::parse(content).unwrap();
        let java = config.get_language_config("java").unwrap();
        assert_eq!(java.spec_versions(), ["v1"]);
        // sections only filled for targeted versions
        assert!(java.spec_sections_for("v2").is_empty());
    }

    #[test]
    fn test_commands_never_missing_after_resolution() {
        let content = r#"
spec_versions: [v1, v2]
languages:
  java: {}
"#;
        let config = Config::parse(content).unwrap();
        let java = config.get_language_config("java").unwrap();
        for version in java.spec_versions() {
            // no generation configured at all: still resolves, to empty
            assert!(java.commands_for(version).is_empty());
            assert!(java.test_commands_for(version).is_empty());
            assert!(java.generation_for(version).is_some());
        }
    }

    #[test]
    fn test_root_spec_sections_for_unknown_version_is_empty() {
        let config = Config::parse("spec_versions: [v1]").unwrap();
        assert!(config.spec_sections_for("v1").is_empty());
        assert!(config.spec_sections_for("nope").is_empty());
    }

    #[test]
    fn test_resolution_fills_image_default() {
        let content = r#"
spec_versions: [v1]
languages:
  go:
    spec_versions: [v1]
"#;
        let config = Config::parse(content).unwrap();
        let go = config.get_language_config("go").unwrap();
        let resolved = go.container_opts_for("v1");
        assert_eq!(
            resolved.image(),
            ImageSource::Reference(crate::defaults::DEFAULT_CONTAINER_IMAGE.to_string())
        );
        assert!(!resolved.is_system());
        assert_eq!(resolved.workdir(), ".");
    }

    #[test]
    fn test_inheritance_idempotence() {
        // a child with no explicit opts resolves to a structural copy of the
        // resolved parent
        let parent = ContainerOpts::resolve(
            Some(ContainerOpts {
                environment: env(&[("A", "1")]),
                image: Some(ImageSource::Reference("img:1".to_string())),
                ..Default::default()
            }),
            &ContainerOpts::default(),
        );
        let child = ContainerOpts::resolve(None, &parent);
        assert_eq!(child, parent);
    }

    #[test]
    fn test_environment_merge_precedence() {
        let parent = ContainerOpts::resolve(
            Some(ContainerOpts {
                environment: env(&[("SHARED", "parent"), ("ONLY_PARENT", "1")]),
                ..Default::default()
            }),
            &ContainerOpts::default(),
        );
        let child = ContainerOpts::resolve(
            Some(ContainerOpts {
                environment: env(&[("SHARED", "child")]),
                ..Default::default()
            }),
            &parent,
        );
        assert_eq!(child.environment.get("SHARED").map(String::as_str), Some("child"));
        assert_eq!(
            child.environment.get("ONLY_PARENT").map(String::as_str),
            Some("1")
        );
    }

    #[test]
    fn test_inherit_false_isolation() {
        let parent = ContainerOpts::resolve(
            Some(ContainerOpts {
                environment: env(&[("FROM_PARENT", "1")]),
                image: Some(ImageSource::Reference("parent:img".to_string())),
                system: Some(true),
                workdir: Some("sub".to_string()),
                ..Default::default()
            }),
            &ContainerOpts::default(),
        );
        let child = ContainerOpts::resolve(
            Some(ContainerOpts {
                environment: env(&[("OWN", "1")]),
                inherit: Some(false),
                ..Default::default()
            }),
            &parent,
        );
        // environment and scalars untouched; only image came from the parent
        assert_eq!(child.environment, env(&[("OWN", "1")]));
        assert!(!child.is_system());
        assert_eq!(child.workdir(), ".");
        assert_eq!(
            child.image(),
            ImageSource::Reference("parent:img".to_string())
        );
    }

    #[test]
    fn test_image_build_spec_parses() {
        let content = r#"
spec_versions: [v1]
container_opts:
  image:
    dockerfile: Dockerfile.generate
    context: .
languages:
  go:
    spec_versions: [v1]
"#;
        let config = Config::parse(content).unwrap();
        let go = config.get_language_config("go").unwrap();
        match go.container_opts_for("v1").image() {
            ImageSource::Build { dockerfile, context } => {
                assert_eq!(dockerfile, "Dockerfile.generate");
                assert_eq!(context, ".");
            }
            other => panic!("expected build spec, got {:?}", other),
        }
    }

    #[test]
    fn test_token_parsing_variants() {
        let yaml = r#"
commandline:
  - literal
  - function: glob
    args: ["src/*.mustache"]
  - item: "https://secret@github.com"
    secret: true
description: mixed tokens
"#;
        let command: TemplatedCommand = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(command.commandline.len(), 3);
        assert_eq!(command.commandline[0], Token::Literal("literal".to_string()));
        match &command.commandline[1] {
            Token::Call { function, args, kwargs } => {
                assert_eq!(function, "glob");
                assert_eq!(args, &["src/*.mustache".to_string()]);
                assert!(kwargs.is_empty());
            }
            other => panic!("expected function call, got {:?}", other),
        }
        assert!(matches!(
            &command.commandline[2],
            Token::Secret { secret: true, .. }
        ));
    }

    #[test]
    fn test_command_description_default() {
        let command: TemplatedCommand =
            serde_yaml::from_str("commandline: [echo]").unwrap();
        assert_eq!(command.description, "Generic command");
    }

    #[test]
    fn test_config_parses_json_document() {
        let json = r#"{"spec_versions": ["v1"], "languages": {"go": {"github_repo_name": "go-client"}}}"#;
        let config = Config::parse(json).unwrap();
        let go = config.get_language_config("go").unwrap();
        assert_eq!(go.github_repo_name.as_deref(), Some("go-client"));
        assert_eq!(go.spec_versions(), ["v1"]);
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(Config::from_file("definitely-not-here.yaml").is_err());
    }
}
