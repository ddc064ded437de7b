//! [`SyncCoordinator`] — both levels of the sync locking discipline in
//! one injectable object.
//!
//! The in-process mutex serialises every cycle (push or pull) within a
//! process. The advisory lock file additionally ensures at most one
//! process runs the periodic pull loop; a contending process skips the
//! loop without error. Push cycles are *not* file-locked — concurrent
//! pushes across processes are expected to race and fail softly.

use std::{
  fs::OpenOptions,
  io::{ErrorKind, Write as _},
  path::PathBuf,
};

use tokio::sync::{Mutex, MutexGuard};

pub struct SyncCoordinator {
  cycle:     Mutex<()>,
  lock_path: PathBuf,
}

impl SyncCoordinator {
  pub fn new(lock_path: impl Into<PathBuf>) -> Self {
    Self {
      cycle:     Mutex::new(()),
      lock_path: lock_path.into(),
    }
  }

  /// Enter a sync critical section. Held across an entire push or pull
  /// cycle.
  pub async fn cycle_guard(&self) -> MutexGuard<'_, ()> {
    self.cycle.lock().await
  }

  /// Try to become the process that owns the periodic pull loop.
  ///
  /// Returns `None` when another process already holds the lock file —
  /// normal contention, not an error. The returned guard removes the file
  /// on drop.
  pub fn try_pull_lock(&self) -> std::io::Result<Option<PullLock>> {
    match OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&self.lock_path)
    {
      Ok(mut file) => {
        // Best-effort owner hint for operators inspecting a stale file.
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Some(PullLock {
          path: self.lock_path.clone(),
        }))
      }
      Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(None),
      Err(e) => Err(e),
    }
  }
}

/// Held by the single process running the periodic pull loop.
#[derive(Debug)]
pub struct PullLock {
  path: PathBuf,
}

impl Drop for PullLock {
  fn drop(&mut self) {
    if let Err(e) = std::fs::remove_file(&self.path) {
      tracing::warn!(path = %self.path.display(), error = %e, "failed to remove pull lock file");
    }
  }
}
