//! [`RestStore`] — the PostgREST implementation of the snapshot and user
//! stores.

use std::time::Duration;

use randwatch_core::store::{SnapshotRow, SnapshotStore, UserRecord, UserStore};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::{
  encode::{decode_row, encode_row},
  error::{Error, Result},
};

/// Always-true date filter used to clear the snapshot table: every row's
/// date is on or after 1900-01-01.
const DELETE_ALL_FILTER: &str = "gte.1900-01-01";

/// Connection settings for a PostgREST store.
#[derive(Debug, Clone)]
pub struct RestConfig {
  /// Project base URL, e.g. `https://xyz.supabase.co`.
  pub base_url:    String,
  /// Service key, sent both as `apikey` and as a bearer token.
  pub api_key:     String,
  pub data_table:  String,
  pub users_table: String,
}

/// A snapshot + user store backed by a remote PostgREST endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RestStore {
  client: Client,
  config: RestConfig,
}

impl RestStore {
  pub fn new(config: RestConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, config })
  }

  fn table_url(&self, table: &str) -> String {
    format!(
      "{}/rest/v1/{}",
      self.config.base_url.trim_end_matches('/'),
      table
    )
  }

  fn keyed(&self, req: RequestBuilder) -> RequestBuilder {
    req
      .header("apikey", &self.config.api_key)
      .bearer_auth(&self.config.api_key)
  }

  async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status { status, body })
  }
}

// ─── SnapshotStore ───────────────────────────────────────────────────────────

impl SnapshotStore for RestStore {
  type Error = Error;

  async fn delete_all(&self) -> Result<()> {
    let resp = self
      .keyed(self.client.delete(self.table_url(&self.config.data_table)))
      .query(&[("Date", DELETE_ALL_FILTER)])
      .send()
      .await?;
    Self::check(resp).await?;
    tracing::debug!(table = %self.config.data_table, "cleared snapshot table");
    Ok(())
  }

  async fn upsert(&self, rows: &[SnapshotRow]) -> Result<()> {
    let body: Vec<Value> = rows.iter().map(encode_row).collect();
    let resp = self
      .keyed(self.client.post(self.table_url(&self.config.data_table)))
      .header("Prefer", "resolution=merge-duplicates,return=minimal")
      .json(&body)
      .send()
      .await?;
    Self::check(resp).await?;
    tracing::debug!(table = %self.config.data_table, rows = rows.len(), "upserted snapshot rows");
    Ok(())
  }

  async fn rows(&self) -> Result<Vec<SnapshotRow>> {
    let resp = self
      .keyed(self.client.get(self.table_url(&self.config.data_table)))
      .query(&[("select", "*"), ("order", "Date.asc")])
      .send()
      .await?;
    let body: Vec<Value> = Self::check(resp).await?.json().await?;
    body.iter().map(decode_row).collect()
  }
}

// ─── UserStore ───────────────────────────────────────────────────────────────

impl UserStore for RestStore {
  type Error = Error;

  async fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
    let resp = self
      .keyed(self.client.get(self.table_url(&self.config.users_table)))
      .query(&[
        ("username", format!("eq.{username}")),
        ("select", "username,password_hash".to_string()),
      ])
      .send()
      .await?;
    let mut found: Vec<UserRecord> = Self::check(resp).await?.json().await?;
    Ok(found.pop())
  }

  async fn insert_user(&self, user: &UserRecord) -> Result<bool> {
    // Two round-trips, not a conflict-target insert: the remote table
    // predates this service and has no unique constraint we control.
    if self.find_user(&user.username).await?.is_some() {
      return Ok(false);
    }
    let resp = self
      .keyed(self.client.post(self.table_url(&self.config.users_table)))
      .header("Prefer", "return=minimal")
      .json(&[user])
      .send()
      .await?;
    Self::check(resp).await?;
    tracing::info!(username = %user.username, "registered user in remote store");
    Ok(true)
  }
}
