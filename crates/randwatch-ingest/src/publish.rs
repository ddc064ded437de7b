//! The snapshot publisher: full-replace of the remote dataset.
//!
//! Delete-then-upsert is not transactional across the two calls: a crash
//! between them leaves the remote table observably empty until the next
//! successful run. That window is accepted and documented rather than
//! masked; the store's wire protocol offers no multi-statement
//! transaction. (A server-side atomic replace would close it.)

use randwatch_core::{
  frame::AlignedTable,
  store::{SnapshotRow, SnapshotStore},
};

/// What a publish attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
  /// The table was empty; no remote call was made.
  Nothing,
  /// The remote snapshot now holds exactly `rows` rows.
  Replaced { rows: usize },
}

/// Flatten the aligned table into remote rows, nulls carried explicitly.
fn snapshot_rows(table: &AlignedTable) -> Vec<SnapshotRow> {
  table
    .rows()
    .iter()
    .map(|row| SnapshotRow {
      date:   row.date,
      values: table
        .columns()
        .iter()
        .cloned()
        .zip(row.values.iter().copied())
        .collect(),
    })
    .collect()
}

/// Replace the remote snapshot's full contents with `table`.
///
/// Idempotent: publishing the same table twice leaves the same row set as
/// publishing it once. An empty table is a no-op, not a remote wipe.
pub async fn publish<S: SnapshotStore>(
  store: &S,
  table: &AlignedTable,
) -> Result<PublishOutcome, S::Error> {
  if table.is_empty() {
    tracing::info!("empty aligned table; nothing to publish");
    return Ok(PublishOutcome::Nothing);
  }

  let rows = snapshot_rows(table);
  tracing::info!(rows = rows.len(), "replacing remote snapshot");

  store.delete_all().await?;
  store.upsert(&rows).await?;

  Ok(PublishOutcome::Replaced { rows: rows.len() })
}

#[cfg(test)]
pub(crate) mod testing {
  //! In-memory snapshot store shared by the publish and pipeline tests.

  use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use randwatch_core::store::{SnapshotRow, SnapshotStore};

  #[derive(Debug, thiserror::Error)]
  #[error("store offline")]
  pub struct MemError;

  #[derive(Default)]
  pub struct MemStore {
    pub rows:        Mutex<Vec<SnapshotRow>>,
    pub fail_delete: AtomicBool,
    pub fail_upsert: AtomicBool,
  }

  impl MemStore {
    pub fn snapshot(&self) -> Vec<SnapshotRow> {
      self.rows.lock().unwrap().clone()
    }
  }

  impl SnapshotStore for MemStore {
    type Error = MemError;

    async fn delete_all(&self) -> Result<(), MemError> {
      if self.fail_delete.load(Ordering::SeqCst) {
        return Err(MemError);
      }
      self.rows.lock().unwrap().clear();
      Ok(())
    }

    async fn upsert(&self, new_rows: &[SnapshotRow]) -> Result<(), MemError> {
      if self.fail_upsert.load(Ordering::SeqCst) {
        return Err(MemError);
      }
      let mut rows = self.rows.lock().unwrap();
      for row in new_rows {
        match rows.iter_mut().find(|r| r.date == row.date) {
          Some(existing) => *existing = row.clone(),
          None => rows.push(row.clone()),
        }
      }
      rows.sort_by_key(|r| r.date);
      Ok(())
    }

    async fn rows(&self) -> Result<Vec<SnapshotRow>, MemError> {
      Ok(self.snapshot())
    }
  }
}
