//! [`FileRegistry`] — the git-synced local user registry.
//!
//! An append-only JSON array of user records in a single file inside the
//! working copy. The file is the sync agent's payload: a successful
//! append is what triggers a push cycle. Every access holds the
//! [`SyncCoordinator`]'s cycle lock, so a read or write can never land
//! while a sync cycle has the working copy mid-rebase.

use std::{path::PathBuf, sync::Arc};

use randwatch_core::{
  Error, Result,
  store::{UserRecord, UserStore},
};

use crate::coordinator::SyncCoordinator;

pub struct FileRegistry {
  path:        PathBuf,
  coordinator: Arc<SyncCoordinator>,
}

impl FileRegistry {
  pub fn new(path: impl Into<PathBuf>, coordinator: Arc<SyncCoordinator>) -> Self {
    Self {
      path: path.into(),
      coordinator,
    }
  }

  /// Load all records. A missing file is an empty registry.
  ///
  /// Callers outside this module get cycle-lock protection through the
  /// `UserStore` methods; this raw read does not take the lock itself.
  pub async fn load(&self) -> Result<Vec<UserRecord>> {
    match tokio::fs::read(&self.path).await {
      Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
      Err(e) => Err(Error::Io(e)),
    }
  }

  /// Write the full record set via a temp file in the same directory,
  /// renamed into place. A crash mid-write leaves either the old file or
  /// the new one, never a truncated half of each.
  async fn save(&self, records: &[UserRecord]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(records)?;
    let tmp = self.path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, &self.path).await?;
    Ok(())
  }
}

impl UserStore for FileRegistry {
  type Error = Error;

  async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
    let _guard = self.coordinator.cycle_guard().await;
    let records = self.load().await?;
    Ok(records.into_iter().find(|r| r.username == username))
  }

  async fn insert_user(&self, user: &UserRecord) -> Result<bool> {
    let _guard = self.coordinator.cycle_guard().await;
    let mut records = self.load().await?;
    if records.iter().any(|r| r.username == user.username) {
      return Ok(false);
    }
    records.push(user.clone());
    self.save(&records).await?;
    tracing::info!(username = %user.username, "appended user to registry");
    Ok(true)
  }
}
