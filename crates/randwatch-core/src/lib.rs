//! Core types and trait definitions for the randwatch pipeline.
//!
//! This crate is deliberately free of HTTP, git, and runtime dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod align;
pub mod error;
pub mod factor;
pub mod frame;
pub mod progress;
pub mod source;
pub mod store;

pub use error::{Error, Result};
