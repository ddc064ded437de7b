//! The `SeriesSource` trait — one call per provider series.
//!
//! Implemented by provider clients (e.g. `randwatch-fred`). The batch
//! fetch driver is generic over this seam so per-series failure handling
//! and progress arithmetic can be tested without a network.

use std::future::Future;

use crate::frame::Series;

/// A remote provider of dated numeric observations.
///
/// The provider is treated as a black box: rate-limited, fallible per
/// series, and expected to carry its own transport-level timeouts.
pub trait SeriesSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the full available history for `series_id`.
  fn series<'a>(
    &'a self,
    series_id: &'a str,
  ) -> impl Future<Output = Result<Series, Self::Error>> + Send + 'a;
}
