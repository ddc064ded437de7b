//! The repo sync agent: keeps a local working copy (carrying the user
//! registry) reconciled with a remote git origin.
//!
//! Push cycles are triggered by local mutations; a periodic pull loop
//! converges the other direction. All cycles are serialised in-process by
//! the [`SyncCoordinator`]'s mutex; the periodic loop is additionally
//! guarded across processes by an advisory lock file.

pub mod agent;
pub mod branch;
pub mod coordinator;
pub mod error;
pub mod git;
pub mod registry;
pub mod url;

pub use agent::{SyncAgent, SyncConfig};
pub use coordinator::SyncCoordinator;
pub use error::{GitError, SyncError, UrlError};
pub use git::{GitCli, GitRunner};
pub use registry::FileRegistry;
pub use url::RemoteUrl;
