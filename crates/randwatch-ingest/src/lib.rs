//! The ingestion pipeline: fetch → align → publish, as one background
//! unit of work with progress reporting.
//!
//! Every phase returns typed results; nothing propagates past the
//! orchestrator boundary. The caller gets a [`pipeline::PipelineReport`]
//! with a short, specific message either way.

pub mod pipeline;
pub mod publish;

pub use pipeline::{PipelineReport, PipelineUpdate, RunStatus, Window, run_pipeline, spawn_pipeline};
pub use publish::{PublishOutcome, publish};
