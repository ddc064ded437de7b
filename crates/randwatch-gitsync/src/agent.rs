//! [`SyncAgent`] — push and periodic-pull cycles over a [`GitRunner`].
//!
//! Every cycle runs the same preamble (configure remote, configure user,
//! repair shallow history, commit local changes) before its pull/push
//! phase. Phase failures are logged and end the cycle; the next cycle is
//! the retry.

use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;

use crate::{
  branch::resolve_branch,
  coordinator::SyncCoordinator,
  error::{GitError, SyncError},
  git::{self, GitRunner},
  url::RemoteUrl,
};

/// Sentinel commit message for pull-triggered auto-commits. Auto-committing
/// a dirty tree trades curated history for availability: a rebase pull
/// fails outright on uncommitted changes.
pub const PULL_COMMIT_MESSAGE: &str = "randwatch: sync local changes before pull";

/// Agent settings, typically filled from server configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
  /// Access token embedded into the remote URL. `None` leaves the remote
  /// untouched (local development against a path remote).
  pub token:           Option<String>,
  /// Remote URL to create `origin` from when the working copy has no
  /// remote at all.
  pub fallback_remote: Option<String>,
  /// Explicit branch override; wins over every detection step.
  pub branch_override: Option<String>,
  pub bot_name:        String,
  pub bot_email:       String,
  pub pull_interval:   Duration,
  /// Grace period before the first periodic pull, so the service finishes
  /// starting up first.
  pub startup_delay:   Duration,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      token:           None,
      fallback_remote: None,
      branch_override: None,
      bot_name:        "randwatch-bot".to_string(),
      bot_email:       "randwatch-bot@example.com".to_string(),
      pull_interval:   Duration::from_secs(60),
      startup_delay:   Duration::from_secs(5),
    }
  }
}

pub struct SyncAgent<G> {
  git:         G,
  coordinator: Arc<SyncCoordinator>,
  config:      SyncConfig,
}

impl<G: GitRunner> SyncAgent<G> {
  pub fn new(git: G, coordinator: Arc<SyncCoordinator>, config: SyncConfig) -> Self {
    Self {
      git,
      coordinator,
      config,
    }
  }

  // ── Phases ────────────────────────────────────────────────────────────

  /// Ensure a remote exists and carries the current access token.
  /// Returns the remote name to use for pull/push.
  async fn configure_remote(&self) -> Result<String, SyncError> {
    let name = match git::remote_name(&self.git).await {
      Some(name) => name,
      None => {
        let fallback = self
          .config
          .fallback_remote
          .as_deref()
          .ok_or(SyncError::NoRemote)?;
        self.git.run(&["remote", "add", "origin", fallback]).await?;
        tracing::info!("created origin remote from fallback url");
        "origin".to_string()
      }
    };

    if let Some(token) = &self.config.token {
      let raw = self.git.run(&["remote", "get-url", &name]).await?;
      let tokenized = RemoteUrl::parse(&raw)?.with_token(token);
      let rewritten = tokenized.to_string();
      if rewritten != raw {
        self.git.run(&["remote", "set-url", &name, &rewritten]).await?;
        tracing::info!(remote = %name, url = %tokenized.redacted(), "remote url updated with access token");
      }
    }

    Ok(name)
  }

  /// Set the bot commit identity, but never overwrite an existing one.
  async fn configure_user(&self) -> Result<(), SyncError> {
    if git::config_get(&self.git, "user.email").await.is_none() {
      self
        .git
        .run(&["config", "user.email", &self.config.bot_email])
        .await?;
    }
    if git::config_get(&self.git, "user.name").await.is_none() {
      self
        .git
        .run(&["config", "user.name", &self.config.bot_name])
        .await?;
    }
    Ok(())
  }

  /// Fetch full history when the clone is shallow. Failure is a warning:
  /// the subsequent pull may still succeed if the remote hasn't diverged.
  async fn repair_shallow(&self) {
    match git::is_shallow(&self.git).await {
      Ok(true) => {
        tracing::info!("shallow repository detected; fetching full history");
        if let Err(e) = self
          .git
          .run(&["fetch", "--unshallow", "--update-head-ok"])
          .await
        {
          tracing::warn!(error = %e, "could not unshallow repository");
        }
      }
      Ok(false) => {}
      Err(e) => tracing::warn!(error = %e, "could not determine shallow status"),
    }
  }

  /// Stage everything (untracked included) and commit when there is
  /// anything to commit. Returns whether a commit was made.
  async fn commit_if_dirty(&self, message: &str) -> Result<bool, SyncError> {
    self.git.run(&["add", "-A"]).await?;
    if !git::is_dirty(&self.git).await? {
      return Ok(false);
    }
    self.git.run(&["commit", "-m", message]).await?;
    tracing::info!(message, "committed local changes");
    Ok(true)
  }

  async fn pull_rebase(&self, remote: &str, branch: &str) -> Result<(), SyncError> {
    match self.git.run(&["pull", "--rebase", remote, branch]).await {
      Ok(_) => Ok(()),
      // An up-to-date branch is a success, whatever git printed it on.
      Err(GitError::Failed { ref stderr, .. })
        if stderr.to_lowercase().contains("already up to date") =>
      {
        Ok(())
      }
      Err(e) => {
        // A conflicted rebase leaves the working copy in
        // rebase-in-progress state, which would wedge every later cycle.
        // Abort it so the next cycle starts from a clean tree; when the
        // failure was not a conflict there is nothing to abort and the
        // abort itself fails, harmlessly.
        match self.git.run(&["rebase", "--abort"]).await {
          Ok(_) => tracing::warn!("rebase conflict; aborted to restore a clean tree"),
          Err(abort) => tracing::debug!(error = %abort, "no rebase in progress to abort"),
        }
        Err(e.into())
      }
    }
  }

  // ── Cycles ────────────────────────────────────────────────────────────

  /// Commit local state and push it out. Triggered by a local mutation
  /// (e.g. a registry append). Failures are logged, never raised: the
  /// next pull or push cycle is the retry.
  pub async fn push_cycle(&self, message: &str) {
    let _guard = self.coordinator.cycle_guard().await;
    if let Err(e) = self.push_cycle_locked(message).await {
      tracing::warn!(error = %e, "push cycle aborted");
    }
  }

  async fn push_cycle_locked(&self, message: &str) -> Result<(), SyncError> {
    let remote = self.configure_remote().await?;
    self.configure_user().await?;
    self.repair_shallow().await;

    let branch = resolve_branch(&self.git, self.config.branch_override.as_deref()).await;
    tracing::info!(%branch, "push cycle starting");

    self.commit_if_dirty(message).await?;

    if let Err(e) = self.pull_rebase(&remote, &branch).await {
      // Nothing to rebase against (e.g. an empty remote) still allows the
      // push to succeed.
      tracing::warn!(error = %e, "pre-push pull failed; attempting push anyway");
    }

    self.git.run(&["push", &remote, &branch]).await?;
    tracing::info!(%branch, "push successful");
    Ok(())
  }

  /// One iteration of the periodic pull: converge local state with the
  /// remote without pushing.
  pub async fn pull_cycle(&self) {
    let _guard = self.coordinator.cycle_guard().await;
    if let Err(e) = self.pull_cycle_locked().await {
      tracing::warn!(error = %e, "periodic pull failed");
    }
  }

  async fn pull_cycle_locked(&self) -> Result<(), SyncError> {
    let remote = self.configure_remote().await?;
    self.configure_user().await?;
    self.repair_shallow().await;
    self.commit_if_dirty(PULL_COMMIT_MESSAGE).await?;

    let branch = resolve_branch(&self.git, self.config.branch_override.as_deref()).await;
    self.pull_rebase(&remote, &branch).await
  }

  /// Run the periodic pull loop forever — in the one process that wins
  /// the advisory file lock. Contenders return immediately and cleanly.
  pub async fn run_periodic(self: Arc<Self>) {
    let _lock = match self.coordinator.try_pull_lock() {
      Ok(Some(lock)) => lock,
      Ok(None) => {
        tracing::info!("another process owns the periodic pull loop; not starting");
        return;
      }
      Err(e) => {
        tracing::warn!(error = %e, "could not create pull lock file; periodic pull disabled");
        return;
      }
    };

    tokio::time::sleep(self.config.startup_delay).await;
    tracing::info!(interval = ?self.config.pull_interval, "periodic pull loop started");

    let mut ticker = tokio::time::interval(self.config.pull_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      self.pull_cycle().await;
    }
  }
}
