//! Branch resolution for sync cycles.
//!
//! Order: explicit override → currently checked-out branch → first
//! existing candidate → fixed default. Deploy platforms often leave the
//! working copy on a detached HEAD, which is why the fallback chain runs
//! this deep.

use crate::git::{self, GitRunner};

pub const BRANCH_CANDIDATES: [&str; 2] = ["main", "master"];
pub const DEFAULT_BRANCH: &str = "main";

pub async fn resolve_branch<G: GitRunner>(git: &G, override_branch: Option<&str>) -> String {
  if let Some(branch) = override_branch {
    if !branch.is_empty() {
      return branch.to_string();
    }
  }

  if let Some(branch) = git::current_branch(git).await {
    return branch;
  }

  for candidate in BRANCH_CANDIDATES {
    if git::branch_exists(git, candidate).await {
      return candidate.to_string();
    }
  }

  DEFAULT_BRANCH.to_string()
}
