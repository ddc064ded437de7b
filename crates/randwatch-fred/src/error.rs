//! Error type for `randwatch-fred`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http client error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("FRED request failed with status {0}")]
  Status(reqwest::StatusCode),

  #[error("invalid FRED date {0:?}: {1}")]
  BadDate(String, chrono::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
