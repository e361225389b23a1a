//! Templates command implementation
//!
//! Fetches upstream generator templates for every selected
//! `(language, version)` pair that configures them, applies the configured
//! patches in order, and installs the result under
//! `templates/<language>/<version>`.
//!
//! Template sources are fetched into a temporary directory that is removed
//! on every exit path (the `TempDir` guard drops on success, early return
//! and error alike). Containers created only to extract a generator jar
//! follow the same discipline: create, copy out, then always remove.
//!
//! A failing patch aborts the whole run: templates in a half-patched state
//! would produce subtly wrong code for every language generated afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use log::{debug, error, info, warn, Level};
use tempfile::TempDir;

use crate::cli::GlobalArgs;
use crate::commands::{copy_tree, Context};
use crate::config::{TemplatesConfig, TemplatesSource};
use crate::error::Error;
use crate::exec::{run_command, CmdPart};
use crate::git;

/// Arguments for the templates command
#[derive(Args, Debug)]
pub struct TemplatesArgs {}

/// Copy a generator jar out of a container image.
///
/// The container exists only for the copy and is removed afterwards even
/// when the copy fails.
fn extract_jar_from_image(
    image: &str,
    jar_path: &str,
    work_dir: &Path,
) -> crate::error::Result<PathBuf> {
    let created = run_command(
        &[
            CmdPart::plain("docker"),
            CmdPart::plain("create"),
            CmdPart::plain(image),
        ],
        "create container for jar extraction",
        Path::new("."),
        &BTreeMap::new(),
        Level::Info,
        false,
    )?;
    let container_id = created.stdout.trim().to_string();

    let extracted = (|| -> crate::error::Result<PathBuf> {
        let target = work_dir.join("generator.jar");
        run_command(
            &[
                CmdPart::plain("docker"),
                CmdPart::plain("cp"),
                CmdPart::plain(format!("{}:{}", container_id, jar_path)),
                CmdPart::plain(target.display().to_string()),
            ],
            "copy jar out of container",
            Path::new("."),
            &BTreeMap::new(),
            Level::Info,
            false,
        )?;
        Ok(target)
    })();

    let removed = run_command(
        &[
            CmdPart::plain("docker"),
            CmdPart::plain("rm"),
            CmdPart::plain("-f"),
            CmdPart::plain(&container_id),
        ],
        "remove extraction container",
        Path::new("."),
        &BTreeMap::new(),
        Level::Debug,
        false,
    );
    if let Err(remove_error) = removed {
        warn!(
            "Failed to remove extraction container {}: {}",
            container_id, remove_error
        );
    }

    extracted
}

/// Fetch the configured source into the scratch dir and return the directory
/// the templates subtree lives under.
fn fetch_source(
    ctx: &Context,
    source: &TemplatesSource,
    scratch: &Path,
) -> crate::error::Result<PathBuf> {
    match source {
        TemplatesSource::OpenapiJar {
            jar_path,
            container_image,
            ..
        } => {
            let jar = match container_image {
                Some(image) => extract_jar_from_image(image, jar_path, scratch)?,
                None => ctx.global.spec_repo_dir.join(jar_path),
            };
            let extract_dir = scratch.join("jar");
            std::fs::create_dir_all(&extract_dir)?;
            run_command(
                &[
                    CmdPart::plain("unzip"),
                    CmdPart::plain("-q"),
                    CmdPart::plain(jar.display().to_string()),
                    CmdPart::plain("-d"),
                    CmdPart::plain(extract_dir.display().to_string()),
                ],
                "extract generator jar",
                Path::new("."),
                &BTreeMap::new(),
                Level::Info,
                false,
            )?;
            Ok(extract_dir)
        }
        TemplatesSource::OpenapiGit {
            repo_url,
            git_committish,
            ..
        } => {
            // template sources clone on the host; the clone relies on the
            // user's git auth setup, which containers don't see
            let clone_dir = scratch.join("upstream");
            git::clone_repository(&CmdPart::plain(repo_url), None, &clone_dir)?;
            git::checkout(&clone_dir, git_committish)?;
            Ok(clone_dir)
        }
        TemplatesSource::Directory { directory_path, .. } => {
            let copy_dir = scratch.join("templates");
            copy_tree(&ctx.global.spec_repo_dir.join(directory_path), &copy_dir)?;
            Ok(copy_dir)
        }
    }
}

fn apply_patches(
    ctx: &Context,
    patches: &[String],
    patch_in: &Path,
) -> crate::error::Result<()> {
    if patches.is_empty() {
        return Ok(());
    }
    info!("Applying patches to upstream templates ...");
    for patch in patches {
        let patch_path = ctx.global.spec_repo_dir.join(patch).canonicalize()?;
        let result = run_command(
            &[
                CmdPart::plain("patch"),
                CmdPart::plain("--no-backup-if-mismatch"),
                CmdPart::plain("-p1"),
                CmdPart::plain("-i"),
                CmdPart::plain(patch_path.display().to_string()),
                CmdPart::plain("-d"),
                CmdPart::plain(patch_in.display().to_string()),
            ],
            "apply template patch",
            Path::new("."),
            &BTreeMap::new(),
            Level::Info,
            false,
        );
        if result.is_err() {
            error!(
                "Failed to apply patch {}, exiting as templates can't be processed",
                patch
            );
            return result.map(|_| ());
        }
    }
    Ok(())
}

fn process_templates(
    ctx: &Context,
    language: &str,
    version: &str,
    templates_config: &TemplatesConfig,
) -> crate::error::Result<()> {
    let scratch = TempDir::new()?;
    let fetched = fetch_source(ctx, &templates_config.source, scratch.path())?;
    apply_patches(ctx, &templates_config.patches, &fetched)?;

    let source = fetched.join(templates_config.source.templates_dir());
    if !source.exists() {
        return Err(Error::ConfigParse {
            message: format!(
                "templates source for {}/{} has no '{}' directory",
                language,
                version,
                templates_config.source.templates_dir()
            ),
            hint: None,
        });
    }

    let target = ctx.template_dir().join(language).join(version);
    if target.exists() {
        std::fs::remove_dir_all(&target)?;
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    copy_tree(&source, &target)?;
    info!("Installed templates into {}", target.display());
    Ok(())
}

/// Execute the templates command
pub fn execute(global: &GlobalArgs, _args: TemplatesArgs) -> Result<i32> {
    let ctx = Context::load(global)?;

    for (language, version) in ctx.pairs()? {
        let language_config = ctx.config.get_language_config(&language)?;
        let Some(templates_config) = language_config.templates_config_for(&version) else {
            debug!("No templates configured for {}/{}", language, version);
            continue;
        };
        if ctx.global.dry_run {
            info!("Would process templates for {}/{}", language, version);
            continue;
        }
        info!("Obtaining upstream templates for {}/{} ...", language, version);
        process_templates(&ctx, &language, &version, templates_config)?;
    }

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::config::Config;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    fn context_in(spec_repo: &Path) -> Context {
        let global = TestCli::parse_from([
            "apigentools",
            "--spec-repo-dir",
            spec_repo.to_str().unwrap(),
        ])
        .global;
        Context {
            config: Config::parse("spec_versions: [v1]").unwrap(),
            global,
        }
    }

    #[test]
    fn test_process_templates_from_directory_source() {
        let temp = tempfile::tempdir().unwrap();
        let upstream = temp.path().join("upstream-templates");
        std::fs::create_dir_all(upstream.join("Java")).unwrap();
        std::fs::write(upstream.join("Java/api.mustache"), "{{classname}}").unwrap();

        let ctx = context_in(temp.path());
        let templates_config = TemplatesConfig {
            patches: vec![],
            source: TemplatesSource::Directory {
                directory_path: "upstream-templates".to_string(),
                templates_dir: "Java".to_string(),
            },
        };

        process_templates(&ctx, "java", "v1", &templates_config).unwrap();

        let installed = temp.path().join("templates/java/v1/api.mustache");
        assert_eq!(
            std::fs::read_to_string(installed).unwrap(),
            "{{classname}}"
        );
    }

    #[test]
    fn test_process_templates_missing_templates_dir_is_error() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("upstream-templates")).unwrap();

        let ctx = context_in(temp.path());
        let templates_config = TemplatesConfig {
            patches: vec![],
            source: TemplatesSource::Directory {
                directory_path: "upstream-templates".to_string(),
                templates_dir: "Java".to_string(),
            },
        };

        assert!(process_templates(&ctx, "java", "v1", &templates_config).is_err());
    }

    #[test]
    fn test_reinstall_replaces_previous_templates() {
        let temp = tempfile::tempdir().unwrap();
        let upstream = temp.path().join("upstream-templates");
        std::fs::create_dir_all(upstream.join("Java")).unwrap();
        std::fs::write(upstream.join("Java/api.mustache"), "new").unwrap();

        // a stale file from a previous install
        let target = temp.path().join("templates/java/v1");
        std::fs::create_dir_all(&target).unwrap();
        std::fs::write(target.join("stale.mustache"), "old").unwrap();

        let ctx = context_in(temp.path());
        let templates_config = TemplatesConfig {
            patches: vec![],
            source: TemplatesSource::Directory {
                directory_path: "upstream-templates".to_string(),
                templates_dir: "Java".to_string(),
            },
        };

        process_templates(&ctx, "java", "v1", &templates_config).unwrap();

        assert!(!target.join("stale.mustache").exists());
        assert!(target.join("api.mustache").exists());
    }
}
