//! Error types for `randwatch-gitsync`.

use thiserror::Error;

/// Failure of a single git invocation.
#[derive(Debug, Error)]
pub enum GitError {
  #[error("failed to spawn git: {0}")]
  Spawn(#[from] std::io::Error),

  #[error("`git {command}` failed: {stderr}")]
  Failed { command: String, stderr: String },
}

/// Failure of a remote-URL parse or rewrite.
#[derive(Debug, Error)]
pub enum UrlError {
  #[error("unsupported remote url: {0:?}")]
  Unsupported(String),

  #[error("remote url has no host: {0:?}")]
  MissingHost(String),
}

/// Failure of one phase of a sync cycle. Cycles catch these, log them,
/// and return to idle; they never propagate to the caller that triggered
/// the cycle.
#[derive(Debug, Error)]
pub enum SyncError {
  #[error(transparent)]
  Git(#[from] GitError),

  #[error(transparent)]
  Url(#[from] UrlError),

  #[error("no git remote configured and no fallback url set")]
  NoRemote,
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
