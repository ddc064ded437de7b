//! HTTP surface for the randwatch dashboard backend.
//!
//! Exposes an axum [`Router`] over any [`SeriesSource`], [`SnapshotStore`]
//! and [`UserStore`]: account registration and login, an ingestion trigger,
//! a progress poll, and the latest aligned snapshot.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod runs;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use randwatch_core::{source::SeriesSource, store::{SnapshotStore, UserStore}};
use serde::Deserialize;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use runs::RunTracker;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `RANDWATCH_*` environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  /// FRED API key for outbound series fetches.
  pub fred_api_key:  String,
  /// Base URL of the remote snapshot store (no trailing `/rest/v1`).
  pub store_url:     String,
  pub store_api_key: String,
  pub data_table:    String,
  pub users_table:   String,
  /// Working copy the user registry lives in and syncs through.
  pub repo_path:     PathBuf,
  /// Registry file name inside `repo_path`.
  pub registry_file: String,
  pub git_token:     Option<String>,
  pub git_remote:    Option<String>,
  pub git_branch:    Option<String>,
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<Src, St, U> {
  pub source:    Arc<Src>,
  pub snapshots: Arc<St>,
  pub users:     Arc<U>,
  pub runs:      Arc<RunTracker>,
  /// Registration handlers send the new username here to request a repo
  /// push; `None` disables syncing entirely.
  pub sync_tx:   Option<mpsc::UnboundedSender<String>>,
}

impl<Src, St, U> Clone for AppState<Src, St, U> {
  fn clone(&self) -> Self {
    Self {
      source:    Arc::clone(&self.source),
      snapshots: Arc::clone(&self.snapshots),
      users:     Arc::clone(&self.users),
      runs:      Arc::clone(&self.runs),
      sync_tx:   self.sync_tx.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the API surface.
pub fn router<Src, St, U>(state: AppState<Src, St, U>) -> Router
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
  U: UserStore + 'static,
{
  Router::new()
    .route("/api/register", post(handlers::register::<Src, St, U>))
    .route("/api/login",    post(handlers::login::<Src, St, U>))
    .route("/api/refresh",  post(handlers::refresh::<Src, St, U>))
    .route("/api/progress", get(handlers::progress::<Src, St, U>))
    .route("/api/data",     get(handlers::data::<Src, St, U>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
