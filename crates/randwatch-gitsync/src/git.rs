//! The `GitRunner` seam and its CLI implementation.
//!
//! Every repository operation funnels through [`GitRunner::run`], so the
//! sync agent's phase logic is testable against a scripted fake. The real
//! implementation shells out to `git` in a fixed working directory.

use std::{future::Future, path::PathBuf};

use tokio::process::Command;

use crate::error::GitError;

/// Executes git subcommands against one working copy.
pub trait GitRunner: Send + Sync {
  /// Run `git <args>`, returning trimmed stdout on success.
  fn run<'a>(
    &'a self,
    args: &'a [&'a str],
  ) -> impl Future<Output = Result<String, GitError>> + Send + 'a;
}

/// The production runner: `git` invoked as a subprocess.
#[derive(Debug, Clone)]
pub struct GitCli {
  workdir: PathBuf,
}

impl GitCli {
  pub fn new(workdir: impl Into<PathBuf>) -> Self {
    Self {
      workdir: workdir.into(),
    }
  }
}

impl GitRunner for GitCli {
  async fn run(&self, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
      .args(args)
      .current_dir(&self.workdir)
      .output()
      .await?;

    if output.status.success() {
      Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
      Err(GitError::Failed {
        command: args.join(" "),
        stderr:  String::from_utf8_lossy(&output.stderr).trim().to_string(),
      })
    }
  }
}

// ─── Porcelain helpers ───────────────────────────────────────────────────────

/// Whether the working copy has anything to commit, untracked files
/// included.
pub async fn is_dirty<G: GitRunner>(git: &G) -> Result<bool, GitError> {
  let status = git.run(&["status", "--porcelain"]).await?;
  Ok(!status.is_empty())
}

/// Whether the clone has truncated history. A shallow history makes
/// rebase-based pulls fail or produce incorrect merges.
pub async fn is_shallow<G: GitRunner>(git: &G) -> Result<bool, GitError> {
  let out = git.run(&["rev-parse", "--is-shallow-repository"]).await?;
  Ok(out == "true")
}

/// The currently checked-out branch, or `None` on a detached HEAD.
pub async fn current_branch<G: GitRunner>(git: &G) -> Option<String> {
  git
    .run(&["symbolic-ref", "--short", "HEAD"])
    .await
    .ok()
    .filter(|b| !b.is_empty())
}

/// Whether `name` resolves to a local ref.
pub async fn branch_exists<G: GitRunner>(git: &G, name: &str) -> bool {
  git
    .run(&["rev-parse", "--verify", "--quiet", name])
    .await
    .is_ok()
}

/// Merged (local + global) git config value, `None` when unset.
pub async fn config_get<G: GitRunner>(git: &G, key: &str) -> Option<String> {
  git
    .run(&["config", "--get", key])
    .await
    .ok()
    .filter(|v| !v.is_empty())
}

/// The first configured remote name, preferring `origin`.
pub async fn remote_name<G: GitRunner>(git: &G) -> Option<String> {
  let remotes = git.run(&["remote"]).await.ok()?;
  let names: Vec<&str> = remotes
    .lines()
    .map(str::trim)
    .filter(|l| !l.is_empty())
    .collect();
  if names.contains(&"origin") {
    Some("origin".to_string())
  } else {
    names.first().map(|s| s.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn cli_runs_against_a_real_repository() {
    let dir = tempfile::tempdir().unwrap();
    let git = GitCli::new(dir.path());

    git.run(&["init", "--initial-branch=main"]).await.unwrap();
    assert!(!is_dirty(&git).await.unwrap());

    std::fs::write(dir.path().join("users.json"), "[]").unwrap();
    assert!(is_dirty(&git).await.unwrap());
  }

  #[tokio::test]
  async fn cli_reports_failure_with_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let git = GitCli::new(dir.path());

    // Not a repository yet; any porcelain command fails.
    let err = git.run(&["status", "--porcelain"]).await.unwrap_err();
    match err {
      GitError::Failed { command, .. } => assert_eq!(command, "status --porcelain"),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test]
  async fn fresh_clone_is_not_shallow() {
    let dir = tempfile::tempdir().unwrap();
    let git = GitCli::new(dir.path());
    git.run(&["init", "--initial-branch=main"]).await.unwrap();
    assert!(!is_shallow(&git).await.unwrap());
  }
}
