//! PostgREST backend for the randwatch stores.
//!
//! Speaks the Supabase-flavoured REST dialect: filter expressions in the
//! query string, bulk JSON bodies, `Prefer: resolution=merge-duplicates`
//! for upserts. Implements both [`randwatch_core::store::SnapshotStore`]
//! and [`randwatch_core::store::UserStore`].

mod encode;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{RestConfig, RestStore};
