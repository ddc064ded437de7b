//! The ingestion orchestrator: one background unit of work driving
//! fetch → align → publish and reporting through the progress sink.

use std::sync::Arc;

use chrono::NaiveDate;
use randwatch_core::{
  align::align,
  factor::SeriesRequest,
  frame::AlignedTable,
  progress::{ProgressEvent, ProgressSink},
  source::SeriesSource,
  store::SnapshotStore,
};
use randwatch_fred::fetch_series_set;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::publish::{PublishOutcome, publish};

// ─── Window ──────────────────────────────────────────────────────────────────

/// Inclusive date window the aligner clips to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

impl Default for Window {
  /// The dashboard's fixed window: 2000-01-01 through 2026-12-31.
  fn default() -> Self {
    Self {
      start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
      end:   NaiveDate::from_ymd_opt(2026, 12, 31).unwrap_or(NaiveDate::MAX),
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// How a run ended. The distinctions matter for the user-facing message:
/// a total fetch failure and an empty alignment window are different
/// problems with different fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Complete,
  /// The data is fine but persisting it failed; the caller still gets
  /// the table.
  CompleteWithWarning,
  NoData,
  NoDataInRange,
}

/// The orchestrator's only output. No error type: every failure mode is
/// folded into a status and a short, specific message.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
  pub status:  RunStatus,
  pub message: String,
  pub table:   AlignedTable,
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

/// Run the full pipeline once, synchronously from the caller's view.
pub async fn run_pipeline<Src, St, P>(
  source: &Src,
  store: &St,
  request: &SeriesRequest,
  window: Window,
  sink: &P,
) -> PipelineReport
where
  Src: SeriesSource,
  St: SnapshotStore,
  P: ProgressSink,
{
  let raw = fetch_series_set(source, request, sink).await;
  if raw.is_empty() {
    tracing::warn!("pipeline run fetched no series at all");
    return PipelineReport {
      status:  RunStatus::NoData,
      message: "No data could be fetched from the provider.".to_string(),
      table:   AlignedTable::empty(),
    };
  }

  let table = align(&raw, window.start, window.end);
  if table.is_empty() {
    tracing::warn!("alignment produced no rows in the requested window");
    return PipelineReport {
      status:  RunStatus::NoDataInRange,
      message: "No data in the requested date range.".to_string(),
      table,
    };
  }

  let summary = format!(
    "Fetched {} factors across {} months.",
    table.columns().len(),
    table.len()
  );

  match publish(store, &table).await {
    Ok(PublishOutcome::Replaced { rows }) => {
      tracing::info!(rows, "pipeline run complete; snapshot replaced");
      PipelineReport {
        status:  RunStatus::Complete,
        message: format!("{summary} Snapshot updated."),
        table,
      }
    }
    // Unreachable with a non-empty table, but not worth a panic.
    Ok(PublishOutcome::Nothing) => PipelineReport {
      status:  RunStatus::Complete,
      message: summary,
      table,
    },
    Err(e) => {
      tracing::warn!(error = %e, "snapshot publish failed; returning data anyway");
      PipelineReport {
        status:  RunStatus::CompleteWithWarning,
        message: format!("{summary} Warning: snapshot publish failed: {e}."),
        table,
      }
    }
  }
}

// ─── Background form ─────────────────────────────────────────────────────────

/// Everything a pipeline task sends back over its channel.
#[derive(Debug)]
pub enum PipelineUpdate {
  Progress(ProgressEvent),
  Done(PipelineReport),
}

/// Spawn the pipeline as a fire-and-forget tokio task.
///
/// Progress and the final report arrive on the returned channel; dropping
/// the receiver does not cancel the run (no cancellation token in this
/// design — a known gap).
pub fn spawn_pipeline<Src, St>(
  source: Arc<Src>,
  store: Arc<St>,
  request: SeriesRequest,
  window: Window,
) -> mpsc::UnboundedReceiver<PipelineUpdate>
where
  Src: SeriesSource + 'static,
  St: SnapshotStore + 'static,
{
  let (tx, rx) = mpsc::unbounded_channel();
  tokio::spawn(async move {
    let progress_tx = tx.clone();
    let sink = move |percent: u8, label: &str, message: &str| {
      let _ = progress_tx.send(PipelineUpdate::Progress(ProgressEvent::new(
        percent, label, message,
      )));
    };
    let report = run_pipeline(source.as_ref(), store.as_ref(), &request, window, &sink).await;
    let _ = tx.send(PipelineUpdate::Done(report));
  });
  rx
}
