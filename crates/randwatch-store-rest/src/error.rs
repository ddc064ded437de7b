//! Error type for `randwatch-store-rest`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("store request failed with status {status}: {body}")]
  Status {
    status: reqwest::StatusCode,
    body:   String,
  },

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("malformed snapshot row: {0}")]
  MalformedRow(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
