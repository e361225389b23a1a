//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `apigentools` command-line tool. Each subcommand lives in its own file to
//! keep the logic separated and maintainable.
//!
//! Each command module contains an `Args` struct defining the
//! command-specific flags (derived with `clap`) and an `execute` function
//! taking the shared [`GlobalArgs`](crate::cli::GlobalArgs) plus the parsed
//! `Args`. `execute` returns the process exit code: commands that iterate
//! multiple `(language, version)` pairs accumulate failures and report an
//! aggregate nonzero code rather than aborting at the first one.
//!
//! The shared [`Context`] resolves the configuration once and answers the
//! questions every workflow step asks: which languages and versions are
//! selected, where the conventional directories are, and what substitution
//! variables a command execution receives.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::cli::GlobalArgs;
use crate::config::{Config, LanguageConfig};
use crate::defaults::{locate_config_file, GITHUB_REPO_URL_TEMPLATE, LANGUAGE_CONFIG_DIR};
use crate::error::{Error, Result};
use crate::exec::ExecOptions;
use crate::template;

pub mod completions;
pub mod config;
pub mod generate;
pub mod init;
pub mod merge;
pub mod push;
pub mod split;
pub mod templates;
pub mod validate;

/// Shared state for one command invocation: the resolved configuration plus
/// the global directory and selection flags.
pub(crate) struct Context {
    pub config: Config,
    pub global: GlobalArgs,
}

impl Context {
    /// Load and resolve the configuration for the given global flags.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let config_path = locate_config_file(&global.spec_repo_dir.join(&global.config_dir));
        let config = Config::from_file(&config_path)?;
        Ok(Context {
            config,
            global: global.clone(),
        })
    }

    pub fn config_dir(&self) -> PathBuf {
        self.global.spec_repo_dir.join(&self.global.config_dir)
    }

    pub fn spec_dir(&self) -> PathBuf {
        self.global.spec_repo_dir.join(&self.global.spec_dir)
    }

    pub fn generated_code_dir(&self) -> PathBuf {
        self.global.spec_repo_dir.join(&self.global.generated_code_dir)
    }

    pub fn template_dir(&self) -> PathBuf {
        self.global.spec_repo_dir.join(&self.global.template_dir)
    }

    pub fn template_patches_dir(&self) -> PathBuf {
        self.global
            .spec_repo_dir
            .join(&self.global.template_patches_dir)
    }

    pub fn downstream_templates_dir(&self) -> PathBuf {
        self.global
            .spec_repo_dir
            .join(&self.global.downstream_templates_dir)
    }

    /// Path of the assembled full spec for a version.
    pub fn full_spec_path(&self, version: &str) -> PathBuf {
        self.spec_dir()
            .join(version)
            .join(&self.global.full_spec_file)
    }

    /// Name of the full-spec file a language consumes for a version.
    ///
    /// Languages whose resolved spec sections match the root's share the
    /// version's common full spec; a language overriding its sections gets a
    /// spec of its own, named after it.
    pub fn full_spec_file_for(&self, language: &LanguageConfig, version: &str) -> String {
        if language.spec_sections_for(version) == self.config.spec_sections_for(version) {
            return self.global.full_spec_file.clone();
        }
        let base = Path::new(&self.global.full_spec_file);
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.global.full_spec_file.clone());
        match base.extension() {
            Some(ext) => format!("{}.{}.{}", stem, language.name, ext.to_string_lossy()),
            None => format!("{}.{}", stem, language.name),
        }
    }

    /// Path of the full spec a language consumes for a version.
    pub fn full_spec_path_for(&self, language: &LanguageConfig, version: &str) -> PathBuf {
        self.spec_dir()
            .join(version)
            .join(self.full_spec_file_for(language, version))
    }

    /// Path of the per-language generator config for a `(language, version)`.
    pub fn language_oapi_config_path(&self, language: &str, version: &str) -> PathBuf {
        self.config_dir()
            .join(LANGUAGE_CONFIG_DIR)
            .join(format!("{}_{}.json", language, version))
    }

    /// The languages selected by `--languages`, validated against the
    /// configuration; all configured languages when the filter is empty.
    pub fn selected_languages(&self) -> Result<Vec<String>> {
        if self.global.languages.is_empty() {
            return Ok(self.config.language_names());
        }
        for language in &self.global.languages {
            self.config.get_language_config(language)?;
        }
        Ok(self.global.languages.clone())
    }

    /// The versions selected by `--api-versions`, validated against the
    /// global version list; all declared versions when the filter is empty.
    pub fn selected_versions(&self) -> Result<Vec<String>> {
        if self.global.api_versions.is_empty() {
            return Ok(self.config.spec_versions.clone());
        }
        for version in &self.global.api_versions {
            if !self.config.spec_versions.contains(version) {
                return Err(Error::VersionNotFound {
                    version: version.clone(),
                    referrer: "--api-versions".to_string(),
                });
            }
        }
        Ok(self.global.api_versions.clone())
    }

    /// The `(language, version)` pairs this invocation operates on: the
    /// user's filters intersected with each language's declared versions,
    /// in declared order.
    pub fn pairs(&self) -> Result<Vec<(String, String)>> {
        let languages = self.selected_languages()?;
        let versions = self.selected_versions()?;
        let mut pairs = Vec::new();
        for language in languages {
            let language_config = self.config.get_language_config(&language)?;
            for version in language_config.spec_versions() {
                if versions.contains(version) {
                    pairs.push((language.clone(), version.clone()));
                }
            }
        }
        Ok(pairs)
    }

    pub fn exec_options(&self) -> ExecOptions {
        ExecOptions {
            dry_run: self.global.dry_run,
            ..Default::default()
        }
    }

    /// Output directory for a `(language, version)` pair, relative to the
    /// process working directory (kept relative so container execution can
    /// re-root it under the in-container mountpoint).
    pub fn version_output_dir(&self, language: &LanguageConfig, version: &str) -> PathBuf {
        language.generated_lang_version_dir(&self.generated_code_dir(), version)
    }

    /// Substitution variables shared by all of a language's commands.
    pub fn language_vars(&self, language: &LanguageConfig) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert(
            "github_repo_name".to_string(),
            language.github_repo_name.clone().unwrap_or_default(),
        );
        vars.insert(
            "github_repo_org".to_string(),
            language.github_org_name.clone().unwrap_or_default(),
        );
        vars.insert(
            "github_repo_url".to_string(),
            template::render(GITHUB_REPO_URL_TEMPLATE, &vars),
        );
        vars.insert("language_name".to_string(), language.name.clone());
        vars.insert(
            "library_version".to_string(),
            language.library_version.clone().unwrap_or_default(),
        );
        vars.insert(
            "user_agent_client_name".to_string(),
            self.config.user_agent_client_name.clone(),
        );
        vars
    }

    /// Substitution variables for one `(language, version)` pair. Paths are
    /// expressed relative to the pair's output directory, which is where the
    /// commands run.
    pub fn version_vars(
        &self,
        language: &LanguageConfig,
        version: &str,
    ) -> BTreeMap<String, String> {
        let mut vars = self.language_vars(language);
        // expressed relative to the spec repo root, like every target path,
        // so the ../ prefix comes out right wherever the repo itself lives
        let output_dir =
            language.generated_lang_version_dir(&self.global.generated_code_dir, version);

        vars.insert("spec_version".to_string(), version.to_string());
        vars.insert("version_output_dir".to_string(), ".".to_string());
        vars.insert(
            "config_dir".to_string(),
            rel_to(&output_dir, &self.global.config_dir),
        );
        vars.insert(
            "full_spec_path".to_string(),
            rel_to(
                &output_dir,
                &self
                    .global
                    .spec_dir
                    .join(version)
                    .join(self.full_spec_file_for(language, version)),
            ),
        );
        vars.insert(
            "language_config".to_string(),
            rel_to(
                &output_dir,
                &self
                    .global
                    .config_dir
                    .join(LANGUAGE_CONFIG_DIR)
                    .join(format!("{}_{}.json", language.name, version)),
            ),
        );
        vars.insert(
            "templates_dir".to_string(),
            rel_to(
                &output_dir,
                &self.global.template_dir.join(&language.name).join(version),
            ),
        );

        let mut spec_version_vars = BTreeMap::new();
        spec_version_vars.insert("spec_version".to_string(), version.to_string());
        let version_subpath =
            template::render(&language.version_path_template, &spec_version_vars);
        vars.insert(
            "top_level_dir".to_string(),
            "../".repeat(normal_components(Path::new(&version_subpath))),
        );
        vars
    }
}

impl Context {
    /// Substitution variables for commands running at the spec repo root
    /// (validation commands), with paths expressed relative to it.
    pub fn repo_vars(
        &self,
        language: Option<&LanguageConfig>,
        version: &str,
    ) -> BTreeMap<String, String> {
        let mut vars = language
            .map(|l| self.language_vars(l))
            .unwrap_or_default();
        vars.insert("spec_version".to_string(), version.to_string());
        vars.insert(
            "config_dir".to_string(),
            self.global.config_dir.display().to_string(),
        );
        let full_spec_file = language
            .map(|l| self.full_spec_file_for(l, version))
            .unwrap_or_else(|| self.global.full_spec_file.clone());
        vars.insert(
            "full_spec_path".to_string(),
            self.global
                .spec_dir
                .join(version)
                .join(full_spec_file)
                .display()
                .to_string(),
        );
        if let Some(language) = language {
            vars.insert(
                "language_config".to_string(),
                self.global
                    .config_dir
                    .join(LANGUAGE_CONFIG_DIR)
                    .join(format!("{}_{}.json", language.name, version))
                    .display()
                    .to_string(),
            );
            vars.insert(
                "templates_dir".to_string(),
                self.global
                    .template_dir
                    .join(&language.name)
                    .join(version)
                    .display()
                    .to_string(),
            );
            vars.insert(
                "version_output_dir".to_string(),
                language
                    .generated_lang_version_dir(&self.global.generated_code_dir, version)
                    .display()
                    .to_string(),
            );
        }
        vars
    }
}

fn normal_components(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Express `target` (a spec-repo-relative path) relative to `from` (another
/// spec-repo-relative path). Falls back to the joined absolute form when the
/// base is absolute.
fn rel_to(from: &Path, target: &Path) -> String {
    if from.is_absolute() || target.is_absolute() {
        return target.display().to_string();
    }
    format!(
        "{}{}",
        "../".repeat(normal_components(from)),
        target.display()
    )
}

/// Assemble the full specs every selected version (and every language
/// overriding its sections) consumes. Used by generate, merge and validate.
pub(crate) fn assemble_full_specs(
    ctx: &Context,
    versions: &[String],
    pairs: &[(String, String)],
) -> Result<()> {
    for version in versions {
        crate::assemble::write_full_spec(
            &ctx.spec_dir(),
            version,
            ctx.config.spec_sections_for(version),
            &ctx.full_spec_path(version),
            &std::collections::BTreeSet::new(),
        )?;
    }
    for (language, version) in pairs {
        let language_config = ctx.config.get_language_config(language)?;
        let file_name = ctx.full_spec_file_for(language_config, version);
        if file_name != ctx.global.full_spec_file {
            crate::assemble::write_full_spec(
                &ctx.spec_dir(),
                version,
                language_config.spec_sections_for(version),
                &ctx.spec_dir().join(version).join(file_name),
                &std::collections::BTreeSet::new(),
            )?;
        }
    }
    Ok(())
}

/// Recursively copy a directory tree.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .unwrap_or_else(|_| entry.path());
        if relative.as_os_str().is_empty() {
            std::fs::create_dir_all(dst)?;
            continue;
        }
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    fn global_args(extra: &[&str]) -> GlobalArgs {
        let mut argv = vec!["apigentools"];
        argv.extend(extra);
        TestCli::parse_from(argv).global
    }

    fn context(config_yaml: &str, extra: &[&str]) -> Context {
        Context {
            config: Config::parse(config_yaml).unwrap(),
            global: global_args(extra),
        }
    }

    const PAIRS_CONFIG: &str = r#"
spec_versions: [v1, v2]
spec_sections:
  v1: [x.yaml]
  v2: [y.yaml]
languages:
  java:
    spec_versions: [v1]
  go: {}
"#;

    #[test]
    fn test_pairs_intersect_language_versions() {
        let ctx = context(PAIRS_CONFIG, &[]);
        let pairs = ctx.pairs().unwrap();
        assert_eq!(
            pairs,
            vec![
                ("go".to_string(), "v1".to_string()),
                ("go".to_string(), "v2".to_string()),
                ("java".to_string(), "v1".to_string()),
            ]
        );
    }

    #[test]
    fn test_pairs_never_include_unsupported_version() {
        let ctx = context(PAIRS_CONFIG, &["--languages", "java"]);
        let pairs = ctx.pairs().unwrap();
        assert_eq!(pairs, vec![("java".to_string(), "v1".to_string())]);
    }

    #[test]
    fn test_pairs_with_version_filter() {
        let ctx = context(PAIRS_CONFIG, &["--api-versions", "v2"]);
        let pairs = ctx.pairs().unwrap();
        assert_eq!(pairs, vec![("go".to_string(), "v2".to_string())]);
    }

    #[test]
    fn test_unknown_language_filter_is_error() {
        let ctx = context(PAIRS_CONFIG, &["--languages", "cobol"]);
        assert!(matches!(
            ctx.selected_languages(),
            Err(Error::UnknownLanguage { .. })
        ));
    }

    #[test]
    fn test_unknown_version_filter_is_error() {
        let ctx = context(PAIRS_CONFIG, &["--api-versions", "v9"]);
        assert!(matches!(
            ctx.selected_versions(),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_version_vars_relative_paths() {
        let config = r#"
spec_versions: [v1]
user_agent_client_name: MyClient
languages:
  java:
    github_repo_name: my-gh-repo
    library_version: "1.0.0"
    version_path_template: "{{spec_version}}"
"#;
        let ctx = context(config, &[]);
        let java = ctx.config.get_language_config("java").unwrap();
        let vars = ctx.version_vars(java, "v1");

        assert_eq!(vars["spec_version"], "v1");
        assert_eq!(vars["version_output_dir"], ".");
        assert_eq!(vars["config_dir"], "../../../config");
        assert_eq!(vars["full_spec_path"], "../../../spec/v1/full_spec.yaml");
        assert_eq!(
            vars["language_config"],
            "../../../config/languages/java_v1.json"
        );
        assert_eq!(vars["templates_dir"], "../../../templates/java/v1");
        assert_eq!(vars["top_level_dir"], "../");
        assert_eq!(vars["github_repo_url"], "github.com//my-gh-repo");
        assert_eq!(vars["user_agent_client_name"], "MyClient");
    }

    #[test]
    fn test_copy_tree() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("a.txt"), "a").unwrap();
        std::fs::write(src.join("nested/b.txt"), "b").unwrap();

        let dst = temp.path().join("dst");
        copy_tree(&src, &dst).unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
        assert_eq!(
            std::fs::read_to_string(dst.join("nested/b.txt")).unwrap(),
            "b"
        );
    }
}
