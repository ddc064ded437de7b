//! Progress reporting for long-running pipeline work.
//!
//! The sink contract: called zero or more times per run with a percent in
//! `0..=100` that never decreases, and always eventually called with 100.

use serde::{Deserialize, Serialize};

/// A single progress observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
  pub percent: u8,
  pub label:   String,
  pub message: String,
}

impl ProgressEvent {
  pub fn new(percent: u8, label: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      percent,
      label: label.into(),
      message: message.into(),
    }
  }
}

/// Caller-supplied observer of pipeline progress.
pub trait ProgressSink: Send + Sync {
  fn report(&self, percent: u8, label: &str, message: &str);
}

/// Discards all reports.
pub struct NullSink;

impl ProgressSink for NullSink {
  fn report(&self, _percent: u8, _label: &str, _message: &str) {}
}

impl<F> ProgressSink for F
where
  F: Fn(u8, &str, &str) + Send + Sync,
{
  fn report(&self, percent: u8, label: &str, message: &str) {
    self(percent, label, message)
  }
}
