//! FRED backend for the randwatch series fetcher.
//!
//! [`FredClient`] implements [`randwatch_core::source::SeriesSource`]
//! against the St. Louis Fed observations API; [`fetcher`] holds the
//! provider-agnostic batch driver with progress and pacing.

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::FredClient;
pub use error::{Error, Result};
pub use fetcher::fetch_series_set;
