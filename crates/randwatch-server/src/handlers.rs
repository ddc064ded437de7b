//! JSON request handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use randwatch_core::{
  factor::SeriesRequest,
  frame::INDEX_NAME,
  source::SeriesSource,
  store::{SnapshotRow, SnapshotStore, UserRecord, UserStore},
};
use randwatch_ingest::{Window, spawn_pipeline};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::{
  AppState,
  auth::{hash_password, verify_password},
  error::Error,
  runs,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub async fn register<Src, St, U>(
  State(state): State<AppState<Src, St, U>>,
  Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, Error>
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
  U: UserStore + 'static,
{
  if creds.username.trim().is_empty() || creds.password.is_empty() {
    return Err(Error::BadRequest(
      "username and password must be non-empty".to_string(),
    ));
  }

  let record = UserRecord {
    username:      creds.username.trim().to_string(),
    password_hash: hash_password(&creds.password)?,
  };

  let inserted = state.users.insert_user(&record).await.map_err(Error::store)?;
  if !inserted {
    return Err(Error::UserExists);
  }

  tracing::info!(username = %record.username, "registered new user");
  // Nudge the repo sync so the registry lands upstream promptly.
  if let Some(tx) = &state.sync_tx {
    let _ = tx.send(record.username.clone());
  }

  Ok((
    StatusCode::CREATED,
    Json(json!({ "username": record.username })),
  ))
}

pub async fn login<Src, St, U>(
  State(state): State<AppState<Src, St, U>>,
  Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, Error>
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
  U: UserStore + 'static,
{
  let record = state
    .users
    .find_user(creds.username.trim())
    .await
    .map_err(Error::store)?;

  // Unknown user and wrong password are indistinguishable to the caller.
  match record {
    Some(user) if verify_password(&creds.password, &user.password_hash) => {
      Ok(Json(json!({ "username": user.username })))
    }
    _ => Err(Error::Unauthorized),
  }
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

pub async fn refresh<Src, St, U>(
  State(state): State<AppState<Src, St, U>>,
) -> Result<impl IntoResponse, Error>
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
  U: UserStore + 'static,
{
  if !state.runs.try_begin() {
    return Err(Error::RunInProgress);
  }

  let updates = spawn_pipeline(
    Arc::clone(&state.source),
    Arc::clone(&state.snapshots),
    SeriesRequest::fred_default(),
    Window::default(),
  );
  tokio::spawn(runs::drive(Arc::clone(&state.runs), updates));

  Ok((StatusCode::ACCEPTED, Json(json!({ "started": true }))))
}

pub async fn progress<Src, St, U>(
  State(state): State<AppState<Src, St, U>>,
) -> impl IntoResponse
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
  U: UserStore + 'static,
{
  Json(state.runs.view())
}

pub async fn data<Src, St, U>(
  State(state): State<AppState<Src, St, U>>,
) -> Result<impl IntoResponse, Error>
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
  U: UserStore + 'static,
{
  let rows = state.snapshots.rows().await.map_err(Error::store)?;
  let body: Vec<Value> = rows.iter().map(row_object).collect();
  Ok(Json(body))
}

/// Flatten a snapshot row into one JSON object keyed by column name, with
/// explicit nulls for missing values.
fn row_object(row: &SnapshotRow) -> Value {
  let mut object = Map::new();
  object.insert(
    INDEX_NAME.to_string(),
    Value::String(row.date.format(DATE_FORMAT).to_string()),
  );
  for (name, value) in &row.values {
    let cell = value
      .and_then(serde_json::Number::from_f64)
      .map_or(Value::Null, Value::Number);
    object.insert(name.clone(), cell);
  }
  Value::Object(object)
}

#[cfg(test)]
pub(crate) mod testing {
  use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
  };

  use randwatch_core::frame::Series;

  use crate::runs::RunTracker;

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("backend offline")]
  pub struct FakeError;

  /// Source whose fetches never resolve, pinning a run in the active state.
  pub struct StalledSource;

  impl SeriesSource for StalledSource {
    type Error = FakeError;

    async fn series(&self, _series_id: &str) -> Result<Series, FakeError> {
      std::future::pending().await
    }
  }

  #[derive(Default)]
  pub struct MemSnapshots {
    pub rows: Mutex<Vec<SnapshotRow>>,
  }

  impl SnapshotStore for MemSnapshots {
    type Error = FakeError;

    async fn delete_all(&self) -> Result<(), FakeError> {
      self.rows.lock().unwrap().clear();
      Ok(())
    }

    async fn upsert(&self, rows: &[SnapshotRow]) -> Result<(), FakeError> {
      self.rows.lock().unwrap().extend_from_slice(rows);
      Ok(())
    }

    async fn rows(&self) -> Result<Vec<SnapshotRow>, FakeError> {
      Ok(self.rows.lock().unwrap().clone())
    }
  }

  #[derive(Default)]
  pub struct MemUsers {
    pub users: Mutex<HashMap<String, UserRecord>>,
  }

  impl UserStore for MemUsers {
    type Error = FakeError;

    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, FakeError> {
      Ok(self.users.lock().unwrap().get(username).cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<bool, FakeError> {
      let mut users = self.users.lock().unwrap();
      if users.contains_key(&user.username) {
        return Ok(false);
      }
      users.insert(user.username.clone(), user.clone());
      Ok(true)
    }
  }

  pub type TestState = AppState<StalledSource, MemSnapshots, MemUsers>;

  pub fn state() -> TestState {
    AppState {
      source:    Arc::new(StalledSource),
      snapshots: Arc::new(MemSnapshots::default()),
      users:     Arc::new(MemUsers::default()),
      runs:      Arc::new(RunTracker::new()),
      sync_tx:   None,
    }
  }
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;
  use axum::response::IntoResponse;
  use chrono::NaiveDate;
  use tokio::sync::mpsc;

  use super::testing::state;
  use super::*;

  fn creds(username: &str, password: &str) -> Json<Credentials> {
    Json(Credentials {
      username: username.to_string(),
      password: password.to_string(),
    })
  }

  #[tokio::test]
  async fn register_then_login_round_trips() {
    let state = state();
    register(State(state.clone()), creds("alice", "secret"))
      .await
      .unwrap();

    assert!(login(State(state.clone()), creds("alice", "secret")).await.is_ok());
    assert!(matches!(
      login(State(state), creds("alice", "wrong")).await,
      Err(Error::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn register_stores_a_hash_not_the_password() {
    let state = state();
    register(State(state.clone()), creds("alice", "secret"))
      .await
      .unwrap();

    let stored = state.users.find_user("alice").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "secret");
    assert!(stored.password_hash.starts_with("$argon2"));
  }

  #[tokio::test]
  async fn duplicate_registration_is_refused() {
    let state = state();
    register(State(state.clone()), creds("alice", "secret"))
      .await
      .unwrap();

    assert!(matches!(
      register(State(state), creds("alice", "other")).await,
      Err(Error::UserExists)
    ));
  }

  #[tokio::test]
  async fn empty_credentials_are_rejected() {
    assert!(matches!(
      register(State(state()), creds("  ", "secret")).await,
      Err(Error::BadRequest(_))
    ));
    assert!(matches!(
      register(State(state()), creds("alice", "")).await,
      Err(Error::BadRequest(_))
    ));
  }

  #[tokio::test]
  async fn login_unknown_user_is_unauthorized() {
    assert!(matches!(
      login(State(state()), creds("nobody", "secret")).await,
      Err(Error::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn registration_nudges_the_sync_channel() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut state = state();
    state.sync_tx = Some(tx);

    register(State(state), creds("alice", "secret")).await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), "alice");
  }

  #[tokio::test]
  async fn concurrent_refresh_is_refused() {
    let state = state();
    let first = refresh(State(state.clone())).await.unwrap().into_response();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    // The stalled source keeps the first run active.
    assert!(matches!(
      refresh(State(state.clone())).await,
      Err(Error::RunInProgress)
    ));
    assert!(state.runs.view().running);
  }

  #[tokio::test]
  async fn data_flattens_rows_into_objects() {
    let state = state();
    state
      .snapshots
      .upsert(&[SnapshotRow {
        date:   NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        values: vec![
          ("ZAR_USD".to_string(), Some(18.5)),
          ("VIX".to_string(), None),
        ],
      }])
      .await
      .unwrap();

    let rows = state.snapshots.rows().await.unwrap();
    let object = row_object(&rows[0]);
    assert_eq!(object["Date"], "2024-01-31");
    assert_eq!(object["ZAR_USD"], 18.5);
    assert!(object["VIX"].is_null());
  }
}
