//! branchtree: branch-aware directory tree snapshots
//!
//! Builds ordered, filtered trees of a repository's working directory, caches
//! them per `(root, branch)`, and pushes fresh trees to subscribers when the
//! checked-out branch or the files change.

pub mod api;
pub mod branch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod service;
pub mod snapshot;
pub mod tree;
pub mod watch;

pub use api::App;
pub use branch::BranchId;
pub use crate::config::{ApplicationConfig, ConfigLoader};
pub use error::{ApiError, WalkError, WatchError};
pub use service::{QueryService, TreeEvent};
pub use snapshot::Snapshot;
pub use tree::{FsNode, TreeBuilder};
