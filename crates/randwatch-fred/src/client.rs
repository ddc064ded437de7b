//! [`FredClient`] — the FRED observations API client.

use std::time::Duration;

use chrono::NaiveDate;
use randwatch_core::{frame::Series, source::SeriesSource};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Error, Result};

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

/// FRED caps a single observations request at 100k rows, which covers the
/// full history of every daily series we ask for.
const OBS_LIMIT: usize = 100_000;

/// Async client for the FRED observations endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct FredClient {
  client:   Client,
  api_key:  String,
  base_url: String,
}

impl FredClient {
  pub fn new(api_key: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      base_url: BASE_URL.to_string(),
    })
  }

  /// Point the client at a different endpoint (tests, proxies).
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  async fn fetch_observations(&self, series_id: &str) -> Result<Series> {
    let resp = self
      .client
      .get(&self.base_url)
      .query(&[
        ("series_id", series_id),
        ("api_key", &self.api_key),
        ("file_type", "json"),
        ("sort_order", "asc"),
        ("limit", &OBS_LIMIT.to_string()),
      ])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Status(resp.status()));
    }

    let body: ObservationsResponse = resp.json().await?;

    let mut series = Series::new();
    for obs in body.observations {
      // FRED writes missing observations as ".".
      let Some(value) = parse_value(&obs.value) else {
        continue;
      };
      let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d")
        .map_err(|e| Error::BadDate(obs.date.clone(), e))?;
      series.insert(date, value);
    }
    Ok(series)
  }
}

impl SeriesSource for FredClient {
  type Error = Error;

  async fn series(&self, series_id: &str) -> Result<Series> {
    self.fetch_observations(series_id).await
  }
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
  observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
  date:  String,
  value: String,
}

fn parse_value(raw: &str) -> Option<f64> {
  let trimmed = raw.trim();
  if trimmed == "." || trimmed.is_empty() {
    return None;
  }
  let v = trimmed.parse::<f64>().ok()?;
  v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
  use axum::{Json, Router, routing::get};
  use randwatch_core::source::SeriesSource as _;

  use super::*;

  /// Serve a canned observations payload on a local listener and return
  /// its address.
  async fn stub_endpoint(body: serde_json::Value) -> std::net::SocketAddr {
    let app = Router::new().route("/obs", get(move || async move { Json(body) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    addr
  }

  #[tokio::test]
  async fn fetches_and_decodes_observations() {
    let addr = stub_endpoint(serde_json::json!({
      "observations": [
        { "date": "2024-01-02", "value": "18.42" },
        { "date": "2024-01-03", "value": "." },
        { "date": "2024-01-04", "value": "18.50" },
      ]
    }))
    .await;

    let client = FredClient::new("test-key")
      .unwrap()
      .with_base_url(format!("http://{addr}/obs"));
    let series = client.series("DEXSFUS").await.unwrap();

    // The "." observation is skipped, not zeroed.
    assert_eq!(series.len(), 2);
    let obs: Vec<(NaiveDate, f64)> = series.iter().collect();
    assert_eq!(obs[0], (NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 18.42));
    assert_eq!(obs[1], (NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(), 18.50));
  }

  #[tokio::test]
  async fn malformed_date_is_an_error() {
    let addr = stub_endpoint(serde_json::json!({
      "observations": [{ "date": "02/01/2024", "value": "18.42" }]
    }))
    .await;

    let client = FredClient::new("test-key")
      .unwrap()
      .with_base_url(format!("http://{addr}/obs"));
    assert!(matches!(
      client.series("DEXSFUS").await,
      Err(Error::BadDate(..))
    ));
  }

  #[tokio::test]
  async fn non_success_status_is_an_error() {
    let addr = stub_endpoint(serde_json::json!({ "observations": [] })).await;

    // Wrong path on a live listener yields a 404 from the stub.
    let client = FredClient::new("test-key")
      .unwrap()
      .with_base_url(format!("http://{addr}/missing"));
    assert!(matches!(
      client.series("DEXSFUS").await,
      Err(Error::Status(status)) if status.as_u16() == 404
    ));
  }

  #[test]
  fn parse_value_accepts_decimals() {
    assert_eq!(parse_value("18.42"), Some(18.42));
    assert_eq!(parse_value(" 3.0 "), Some(3.0));
  }

  #[test]
  fn parse_value_rejects_missing_markers() {
    assert_eq!(parse_value("."), None);
    assert_eq!(parse_value(""), None);
    assert_eq!(parse_value("NaN"), None);
    assert_eq!(parse_value("not-a-number"), None);
  }
}
