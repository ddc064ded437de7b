//! Shared state tracking the single in-flight ingestion run.
//!
//! At most one refresh runs at a time; a second trigger while one is
//! active is refused rather than queued. Progress is pull-based — the
//! pipeline task writes here, `GET /api/progress` reads the latest.

use std::sync::{Arc, Mutex};

use randwatch_core::progress::ProgressEvent;
use randwatch_ingest::{PipelineReport, PipelineUpdate};
use serde::Serialize;
use tokio::sync::mpsc;

/// What the progress endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct RunView {
  pub running: bool,
  pub percent: u8,
  pub label:   String,
  pub message: String,
}

struct RunInner {
  running:  bool,
  progress: ProgressEvent,
  last:     Option<PipelineReport>,
}

/// Tracks the active run and the outcome of the most recent one.
pub struct RunTracker {
  inner: Mutex<RunInner>,
}

impl RunTracker {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(RunInner {
        running:  false,
        progress: ProgressEvent::new(0, "idle", "No refresh has run yet."),
        last:     None,
      }),
    }
  }

  /// Claim the run slot. `false` means a run is already active and the
  /// caller must not start another.
  pub fn try_begin(&self) -> bool {
    let mut inner = self.inner.lock().unwrap();
    if inner.running {
      return false;
    }
    inner.running = true;
    inner.progress = ProgressEvent::new(0, "queued", "Refresh queued.");
    true
  }

  pub fn record(&self, event: ProgressEvent) {
    self.inner.lock().unwrap().progress = event;
  }

  pub fn finish(&self, report: PipelineReport) {
    let mut inner = self.inner.lock().unwrap();
    inner.running = false;
    inner.progress = ProgressEvent::new(100, "done", report.message.clone());
    inner.last = Some(report);
  }

  pub fn view(&self) -> RunView {
    let inner = self.inner.lock().unwrap();
    RunView {
      running: inner.running,
      percent: inner.progress.percent,
      label:   inner.progress.label.clone(),
      message: inner.progress.message.clone(),
    }
  }

  pub fn last_report(&self) -> Option<PipelineReport> {
    self.inner.lock().unwrap().last.clone()
  }
}

impl Default for RunTracker {
  fn default() -> Self {
    Self::new()
  }
}

/// Forward pipeline updates into the tracker until the run finishes.
pub async fn drive(
  tracker: Arc<RunTracker>,
  mut updates: mpsc::UnboundedReceiver<PipelineUpdate>,
) {
  while let Some(update) = updates.recv().await {
    match update {
      PipelineUpdate::Progress(event) => tracker.record(event),
      PipelineUpdate::Done(report) => {
        tracker.finish(report);
        return;
      }
    }
  }
  // The pipeline task dropped its sender without a final report. Release
  // the slot so the next trigger is not refused forever.
  tracing::warn!("pipeline channel closed before a final report");
  let mut inner = tracker.inner.lock().unwrap();
  inner.running = false;
  inner.progress = ProgressEvent::new(100, "error", "Refresh ended unexpectedly.");
}

#[cfg(test)]
mod tests {
  use randwatch_core::frame::AlignedTable;
  use randwatch_ingest::RunStatus;

  use super::*;

  fn report() -> PipelineReport {
    PipelineReport {
      status:  RunStatus::Complete,
      message: "done".to_string(),
      table:   AlignedTable::empty(),
    }
  }

  #[test]
  fn second_begin_is_refused_until_finish() {
    let tracker = RunTracker::new();
    assert!(tracker.try_begin());
    assert!(!tracker.try_begin());
    tracker.finish(report());
    assert!(tracker.try_begin());
  }

  #[tokio::test]
  async fn drive_records_progress_and_final_report() {
    let tracker = Arc::new(RunTracker::new());
    assert!(tracker.try_begin());

    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(PipelineUpdate::Progress(ProgressEvent::new(
      50, "fetching", "halfway",
    )))
    .unwrap();
    tx.send(PipelineUpdate::Done(report())).unwrap();
    drop(tx);

    drive(Arc::clone(&tracker), rx).await;

    let view = tracker.view();
    assert!(!view.running);
    assert_eq!(view.percent, 100);
    assert_eq!(tracker.last_report().unwrap().status, RunStatus::Complete);
  }

  #[tokio::test]
  async fn dropped_sender_releases_the_run_slot() {
    let tracker = Arc::new(RunTracker::new());
    assert!(tracker.try_begin());

    let (tx, rx) = mpsc::unbounded_channel::<PipelineUpdate>();
    drop(tx);
    drive(Arc::clone(&tracker), rx).await;

    assert!(!tracker.view().running);
    assert!(tracker.try_begin());
  }
}
