//! The `SnapshotStore` and `UserStore` traits and their row types.
//!
//! Implemented by storage backends (`randwatch-store-rest`, the git-synced
//! file registry). Higher layers depend on these abstractions, not on any
//! concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Snapshot rows ───────────────────────────────────────────────────────────

/// One externally persisted row of the aligned table: a date key plus
/// named, possibly-null factor values. Nulls are carried explicitly so the
/// remote serialisation writes them rather than omitting the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
  pub date:   NaiveDate,
  pub values: Vec<(String, Option<f64>)>,
}

// ─── Snapshot store ──────────────────────────────────────────────────────────

/// Abstraction over the remote dataset store.
///
/// The publish model is full-replace ("repair", not "merge"): the source
/// data is periodically re-derivable in full, and a partial overwrite
/// could leave stale columns from a previous, differently-shaped fetch.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Delete every existing snapshot row (always-true date filter — the
  /// table has no other discriminating key).
  fn delete_all(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Bulk-upsert rows keyed by date.
  fn upsert<'a>(
    &'a self,
    rows: &'a [SnapshotRow],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Read the whole snapshot back, ascending by date.
  fn rows(&self) -> impl Future<Output = Result<Vec<SnapshotRow>, Self::Error>> + Send + '_;
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// A registered user. The credential is an argon2 PHC hash, never the
/// plain password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub username:      String,
  pub password_hash: String,
}

/// Abstraction over the user registry. Two interchangeable backends exist:
/// the remote store and the git-synced local file.
pub trait UserStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;

  /// Insert if the username is free. Returns `false` (and writes nothing)
  /// when it is already taken.
  fn insert_user<'a>(
    &'a self,
    user: &'a UserRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
