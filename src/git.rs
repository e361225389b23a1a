//! Git plumbing for spec-repo stamping and pushing generated code.
//!
//! All operations shell out to the system git command, which automatically
//! handles SSH keys, credential helpers and anything else configured in the
//! user's git setup. Clone URLs may embed OAuth tokens; callers pass those
//! as secret-marked parts so they never reach logs or error output.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, Level};

use crate::defaults::INFO_FILE_NAME;
use crate::error::Result;
use crate::exec::{run_command, CmdPart};

fn git(args: &[&str]) -> Vec<CmdPart> {
    std::iter::once(CmdPart::plain("git"))
        .chain(args.iter().map(|a| CmdPart::plain(*a)))
        .collect()
}

/// Short hash of the current commit of `repo_path`, or `None` when it is not
/// a git checkout (generation then simply proceeds without a commit stamp).
pub fn get_current_commit(repo_path: &Path) -> Option<String> {
    debug!("Getting current commit for stamping ...");
    let parts = git(&["rev-parse", "--short", "HEAD"]);
    match run_command(
        &parts,
        "get current commit",
        repo_path,
        &BTreeMap::new(),
        Level::Debug,
        false,
    ) {
        Ok(output) => {
            let commit = output.stdout.trim().to_string();
            if commit.is_empty() {
                None
            } else {
                Some(commit)
            }
        }
        Err(_) => {
            debug!(
                "Failed getting current git commit for {}, not a git repository",
                repo_path.display()
            );
            None
        }
    }
}

/// Clone a repository. The URL may be secret-marked when it embeds a token.
pub fn clone_repository(url: &CmdPart, depth: Option<u32>, target_dir: &Path) -> Result<()> {
    let mut parts = vec![CmdPart::plain("git"), CmdPart::plain("clone")];
    if let Some(depth) = depth {
        parts.push(CmdPart::plain(format!("--depth={}", depth)));
    }
    parts.push(url.clone());
    parts.push(CmdPart::plain(target_dir.display().to_string()));
    run_command(
        &parts,
        "clone repository",
        Path::new("."),
        &BTreeMap::new(),
        Level::Info,
        false,
    )?;
    Ok(())
}

/// Check out a committish in an existing clone.
pub fn checkout(repo_dir: &Path, committish: &str) -> Result<()> {
    run_command(
        &git(&["checkout", committish]),
        "checkout committish",
        repo_dir,
        &BTreeMap::new(),
        Level::Info,
        false,
    )?;
    Ok(())
}

/// Create and switch to a new branch.
pub fn checkout_new_branch(repo_dir: &Path, branch: &str) -> Result<()> {
    run_command(
        &git(&["checkout", "-b", branch]),
        "create push branch",
        repo_dir,
        &BTreeMap::new(),
        Level::Info,
        false,
    )?;
    Ok(())
}

/// Stage everything and commit. An explicit author avoids depending on the
/// git identity being configured in CI environments.
pub fn commit_all(
    repo_dir: &Path,
    message: &str,
    author: Option<(&str, &str)>,
) -> Result<()> {
    run_command(
        &git(&["add", "-A"]),
        "stage generated code",
        repo_dir,
        &BTreeMap::new(),
        Level::Info,
        false,
    )?;
    let author_cfg = author.map(|(name, email)| {
        (
            format!("user.name={}", name),
            format!("user.email={}", email),
        )
    });
    let mut args: Vec<&str> = Vec::new();
    if let Some((name_cfg, email_cfg)) = &author_cfg {
        args.extend(["-c", name_cfg, "-c", email_cfg]);
    }
    args.extend(["commit", "-m", message]);
    run_command(
        &git(&args),
        "commit generated code",
        repo_dir,
        &BTreeMap::new(),
        Level::Info,
        false,
    )?;
    Ok(())
}

/// Push the current HEAD to origin.
pub fn push_head(repo_dir: &Path, dry_run: bool) -> Result<()> {
    run_command(
        &git(&["push", "origin", "HEAD"]),
        "push generated code",
        repo_dir,
        &BTreeMap::new(),
        Level::Info,
        dry_run,
    )?;
    Ok(())
}

/// Whether the working tree has nothing worth pushing.
///
/// A change to the generation marker file alone does not count: regeneration
/// always touches it, even when no actual code changed.
pub fn status_empty(repo_dir: &Path) -> Result<bool> {
    let output = run_command(
        &git(&["status", "--porcelain"]),
        "check working tree status",
        repo_dir,
        &BTreeMap::new(),
        Level::Debug,
        false,
    )?;
    let meaningful = output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.ends_with(INFO_FILE_NAME));
    Ok(meaningful.count() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_current_commit_outside_repository() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(get_current_commit(temp.path()), None);
    }

    #[test]
    fn test_status_empty_outside_repository_is_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(status_empty(temp.path()).is_err());
    }

    #[test]
    fn test_git_builds_plain_parts() {
        let parts = git(&["status", "--porcelain"]);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].value, "git");
        assert!(parts.iter().all(|p| !p.secret));
    }
}
