//! The batch fetch driver: per-series failure tolerance, monotonic
//! progress, and mandatory pacing between provider calls.

use std::time::Duration;

use randwatch_core::{
  factor::SeriesRequest,
  frame::RawTable,
  progress::ProgressSink,
  source::SeriesSource,
};

/// Minimum delay between successive provider calls. The upstream throttles
/// aggressively; this is a contract, not a tuning knob.
pub const PACING: Duration = Duration::from_millis(500);

/// Percent complete after `done` of `total` attempts, floored.
fn percent(done: usize, total: usize) -> u8 {
  if total == 0 {
    100
  } else {
    ((done * 100) / total) as u8
  }
}

/// Fetch every series in `request`, in order, tolerating per-series
/// failure.
///
/// A failed series is logged and its column omitted; it never aborts the
/// batch. If nothing succeeds the result is an explicitly empty table —
/// callers distinguish "no data" from "call failed" by emptiness.
///
/// The sink observes one report before and one after each attempt, with
/// non-decreasing percents ending at 100, then a final "processing" call
/// before control returns.
pub async fn fetch_series_set<S, P>(source: &S, request: &SeriesRequest, sink: &P) -> RawTable
where
  S: SeriesSource,
  P: ProgressSink,
{
  let total = request.len();
  let mut raw = RawTable::new();

  for (i, spec) in request.iter().enumerate() {
    if i > 0 {
      tokio::time::sleep(PACING).await;
    }

    sink.report(percent(i, total), "fetching", &format!("Fetching {}...", spec.name));
    tracing::debug!(factor = %spec.name, series_id = %spec.series_id, "fetching series");

    match source.series(&spec.series_id).await {
      Ok(series) => {
        tracing::debug!(factor = %spec.name, observations = series.len(), "fetched series");
        raw.push_column(spec.name.clone(), series);
        sink.report(percent(i + 1, total), "fetched", &format!("Fetched {}", spec.name));
      }
      Err(e) => {
        tracing::warn!(factor = %spec.name, series_id = %spec.series_id, error = %e, "series fetch failed; skipping column");
        sink.report(percent(i + 1, total), "error", &format!("Error fetching {}", spec.name));
      }
    }
  }

  sink.report(100, "processing", "Processing data...");
  raw
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, sync::Mutex};

  use chrono::NaiveDate;
  use randwatch_core::{frame::Series, progress::ProgressEvent};

  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("unknown series id")]
  struct FakeError;

  struct FakeSource {
    series: HashMap<String, Series>,
  }

  impl FakeSource {
    fn with(ids: &[&str]) -> Self {
      let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
      let series = ids
        .iter()
        .map(|id| (id.to_string(), [(date, 1.0)].into_iter().collect()))
        .collect();
      Self { series }
    }
  }

  impl SeriesSource for FakeSource {
    type Error = FakeError;

    async fn series(&self, series_id: &str) -> Result<Series, FakeError> {
      self.series.get(series_id).cloned().ok_or(FakeError)
    }
  }

  #[derive(Default)]
  struct Recorder(Mutex<Vec<ProgressEvent>>);

  impl ProgressSink for Recorder {
    fn report(&self, percent: u8, label: &str, message: &str) {
      self
        .0
        .lock()
        .unwrap()
        .push(ProgressEvent::new(percent, label, message));
    }
  }

  impl Recorder {
    fn events(&self) -> Vec<ProgressEvent> {
      self.0.lock().unwrap().clone()
    }
  }

  fn request(entries: &[(&str, &str)]) -> SeriesRequest {
    let mut req = SeriesRequest::new();
    for (name, id) in entries {
      req.push(*name, *id);
    }
    req
  }

  #[tokio::test]
  async fn partial_failure_skips_column_only() {
    let source = FakeSource::with(&["GOOD1", "GOOD2"]);
    let sink = Recorder::default();
    let req = request(&[("A", "GOOD1"), ("B", "GOOD2"), ("C", "BAD")]);

    let raw = fetch_series_set(&source, &req, &sink).await;

    let cols: Vec<&str> = raw.column_names().collect();
    assert_eq!(cols, vec!["A", "B"]);

    let events = sink.events();
    // Two reports per attempt plus the final processing call.
    assert_eq!(events.len(), 7);
    assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(events[events.len() - 2].percent, 100);
    assert_eq!(events.last().unwrap().label, "processing");
    assert_eq!(events.last().unwrap().percent, 100);
  }

  #[tokio::test]
  async fn all_failures_yield_empty_table_and_full_progress() {
    let source = FakeSource::with(&[]);
    let sink = Recorder::default();
    let req = request(&[("A", "BAD1"), ("B", "BAD2")]);

    let raw = fetch_series_set(&source, &req, &sink).await;

    assert!(raw.is_empty());
    let events = sink.events();
    assert_eq!(events.last().unwrap().percent, 100);
    assert!(events.iter().any(|e| e.label == "error"));
  }

  #[tokio::test]
  async fn empty_request_reports_processing_only() {
    let source = FakeSource::with(&[]);
    let sink = Recorder::default();

    let raw = fetch_series_set(&source, &SeriesRequest::new(), &sink).await;

    assert!(raw.is_empty());
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].percent, 100);
  }

  #[tokio::test]
  async fn progress_percentages_are_floored_thirds() {
    let source = FakeSource::with(&["X", "Y", "Z"]);
    let sink = Recorder::default();
    let req = request(&[("A", "X"), ("B", "Y"), ("C", "Z")]);

    fetch_series_set(&source, &req, &sink).await;

    let percents: Vec<u8> = sink.events().iter().map(|e| e.percent).collect();
    assert_eq!(percents, vec![0, 33, 33, 66, 66, 100, 100]);
  }
}
