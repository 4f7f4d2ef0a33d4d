//! Change Watcher
//!
//! Consumes branch-checkout and filesystem-mutation notifications and turns
//! them into cache invalidation plus pushed refreshes on the [`QueryService`].
//! Events are handled one at a time in arrival order.

pub mod batcher;
pub mod source;

use crate::branch::BranchId;
use crate::error::WatchError;
use crate::service::{QueryService, TreeEvent};
use crate::tree::path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

pub use source::{HeadWatcher, TreeWatcher};

/// Watch mode configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Quiet period before a batch of filesystem changes is sent
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How often the batcher wakes up to check for a ready batch
    #[serde(default = "default_batch_window_ms")]
    pub batch_window_ms: u64,
    /// Maximum distinct paths per batch
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Capacity of the subscriber channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_batch_window_ms() -> u64 {
    100
}

fn default_max_batch_size() -> usize {
    100
}

fn default_event_buffer() -> usize {
    crate::service::DEFAULT_EVENT_BUFFER
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            batch_window_ms: default_batch_window_ms(),
            max_batch_size: default_max_batch_size(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Upstream notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The repository checked out a different branch
    BranchCheckout(BranchId),
    /// Paths under a watched root were created, modified, removed or renamed
    PathsChanged(Vec<PathBuf>),
}

/// Drives the [`QueryService`] from a notification stream
pub struct ChangeWatcher {
    service: Arc<QueryService>,
    events: UnboundedReceiver<WatchEvent>,
}

impl ChangeWatcher {
    pub fn new(service: Arc<QueryService>, events: UnboundedReceiver<WatchEvent>) -> Self {
        Self { service, events }
    }

    /// Create a watcher together with the sender its sources feed.
    pub fn channel(service: Arc<QueryService>) -> (mpsc::UnboundedSender<WatchEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(service, rx))
    }

    /// Process events until every sender is gone
    ///
    /// Always ends with [`WatchError::NotificationStreamClosed`]; the service is
    /// marked degraded and keeps serving its cached snapshots.
    pub async fn run(mut self) -> Result<(), WatchError> {
        info!("Change watcher started");
        while let Some(event) = self.events.recv().await {
            match event {
                WatchEvent::BranchCheckout(branch) => {
                    let branch = self.latest_queued_branch(branch);
                    self.on_checkout(branch).await;
                }
                WatchEvent::PathsChanged(paths) => self.on_paths_changed(&paths).await,
            }
        }

        self.service.mark_degraded();
        Err(WatchError::NotificationStreamClosed)
    }

    /// Drain already-queued events, keeping only the newest branch.
    ///
    /// Queued path changes are dropped: the checkout rebuilds every tracked root.
    fn latest_queued_branch(&mut self, mut branch: BranchId) -> BranchId {
        while let Ok(event) = self.events.try_recv() {
            match event {
                WatchEvent::BranchCheckout(newer) => {
                    debug!(skipped = %branch, branch = %newer, "Coalescing checkout");
                    branch = newer;
                }
                WatchEvent::PathsChanged(paths) => {
                    debug!(paths = paths.len(), "Dropping path changes covered by checkout");
                }
            }
        }
        branch
    }

    /// Switch branch, announce it, and push a fresh tree for every tracked root.
    pub async fn on_checkout(&self, branch: BranchId) {
        let roots = self.service.switch_branch(branch.clone());
        self.service.publish(TreeEvent::BranchCheckout(branch));

        for root in roots {
            match self.service.push_fresh(&root).await {
                Ok(snapshot) => debug!(
                    root = %root.display(),
                    sequence = snapshot.sequence,
                    "Pushed tree after checkout"
                ),
                Err(e) => warn!(root = %root.display(), error = %e, "Rebuild after checkout failed"),
            }
        }
    }

    /// Refresh each tracked root that contains one of `paths`.
    pub async fn on_paths_changed(&self, paths: &[PathBuf]) {
        for root in affected_roots(&self.service.tracked_roots(), paths) {
            match self.service.refresh(&root).await {
                Ok(Some(snapshot)) => debug!(
                    root = %root.display(),
                    sequence = snapshot.sequence,
                    "Pushed tree after change"
                ),
                Ok(None) => {}
                Err(e) => warn!(root = %root.display(), error = %e, "Rebuild after change failed"),
            }
        }
    }
}

/// Tracked roots containing at least one of `paths`.
fn affected_roots(roots: &[PathBuf], paths: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .filter(|root| paths.iter().any(|p| path::is_within(root, p)))
        .cloned()
        .collect()
}

/// Whether a watch result means the watcher stopped normally.
pub fn is_stream_closed(result: &Result<(), WatchError>) -> bool {
    matches!(result, Err(WatchError::NotificationStreamClosed))
}

/// Convenience for sources that report a single path.
pub fn path_changed(path: &Path) -> WatchEvent {
    WatchEvent::PathsChanged(vec![path.to_path_buf()])
}
