//! Notification sources backed by `notify`
//!
//! [`HeadWatcher`] turns changes of the repository `HEAD` file into branch
//! checkout events. [`TreeWatcher`] turns mutations under a root into debounced
//! batches of changed paths. Both stop when dropped.

use crate::branch::{self, BranchId};
use crate::error::WatchError;
use crate::filter::{FilterConfig, PathFilter};
use crate::watch::batcher::EventBatcher;
use crate::watch::{WatchConfig, WatchEvent};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, trace, warn};

/// Watches `<repo>/.git/HEAD` for branch checkouts
pub struct HeadWatcher {
    _watcher: RecommendedWatcher,
    initial: Option<BranchId>,
}

impl HeadWatcher {
    /// Start watching the `HEAD` of the repository at `repo_root`
    ///
    /// The `.git` directory is watched rather than the file itself because git
    /// replaces `HEAD` by rename, which would orphan a watch on the old inode.
    /// Only values that differ from the last one seen are sent.
    pub fn spawn(repo_root: &Path, tx: UnboundedSender<WatchEvent>) -> Result<Self, WatchError> {
        let head = branch::head_path(repo_root);
        let git_dir = head
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repo_root.to_path_buf());

        let initial = match branch::read_head(repo_root) {
            Ok(id) => id,
            Err(e) => {
                warn!(head = %head.display(), error = %e, "Could not read HEAD at startup");
                None
            }
        };

        let mut last = initial.clone();
        let repo = repo_root.to_path_buf();
        let watched_head = head.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("HEAD watch error: {}", e);
                    return;
                }
            };
            if matches!(event.kind, EventKind::Access(_))
                || !event.paths.iter().any(|p| p == &watched_head)
            {
                return;
            }

            // Removal is the first half of git's rename; the follow-up create reads the new value
            let current = match branch::read_head(&repo) {
                Ok(Some(id)) => id,
                Ok(None) => return,
                Err(e) => {
                    trace!("HEAD not readable yet: {}", e);
                    return;
                }
            };
            if last.as_ref() == Some(&current) {
                return;
            }
            debug!(branch = %current, "HEAD changed");
            last = Some(current.clone());
            if tx.send(WatchEvent::BranchCheckout(current)).is_err() {
                debug!("Change watcher gone; dropping branch event");
            }
        })?;

        watcher
            .watch(&git_dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::WatchPath {
                path: git_dir.clone(),
                source,
            })?;

        info!(head = %head.display(), initial = ?initial, "Watching HEAD");
        Ok(Self {
            _watcher: watcher,
            initial,
        })
    }

    /// Branch read from `HEAD` when the watcher started.
    pub fn initial_branch(&self) -> Option<&BranchId> {
        self.initial.as_ref()
    }
}

/// Watches a root recursively and sends debounced batches of changed paths
pub struct TreeWatcher {
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl TreeWatcher {
    pub fn spawn(
        root: &Path,
        filter_config: &FilterConfig,
        config: &WatchConfig,
        tx: UnboundedSender<WatchEvent>,
    ) -> Result<Self, WatchError> {
        let (raw_tx, raw_rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            if let Err(e) = raw_tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath {
                path: root.to_path_buf(),
                source,
            })?;

        let filter = PathFilter::new(root, filter_config);
        let batcher = EventBatcher::new(
            Duration::from_millis(config.debounce_ms),
            config.max_batch_size,
        );
        let batch_window = Duration::from_millis(config.batch_window_ms.max(1));
        let git_dir = root.join(".git");

        let worker = std::thread::Builder::new()
            .name("branchtree-fs-watch".to_string())
            .spawn(move || batch_loop(raw_rx, tx, filter, git_dir, batcher, batch_window))
            .map_err(|e| WatchError::WatcherCreation(notify::Error::io(e)))?;

        info!(root = %root.display(), "Watching tree");
        Ok(Self {
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }
}

impl Drop for TreeWatcher {
    fn drop(&mut self) {
        // Dropping the watcher disconnects the raw channel, which ends the loop
        self.watcher.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn is_relevant(filter: &PathFilter, git_dir: &Path, path: &Path) -> bool {
    if path.starts_with(git_dir) {
        return false;
    }
    let is_dir = path.is_dir();
    !filter.is_ignored_path(path, is_dir)
}

fn batch_loop(
    raw_rx: mpsc::Receiver<notify::Result<Event>>,
    tx: UnboundedSender<WatchEvent>,
    filter: PathFilter,
    git_dir: PathBuf,
    mut batcher: EventBatcher,
    batch_window: Duration,
) {
    let flush = |batcher: &mut EventBatcher| -> bool {
        let batch = batcher.take_batch();
        debug!(paths = batch.len(), "Flushing change batch");
        tx.send(WatchEvent::PathsChanged(batch)).is_ok()
    };

    loop {
        match raw_rx.recv_timeout(batch_window) {
            Ok(Ok(event)) => {
                if matches!(event.kind, EventKind::Access(_)) {
                    continue;
                }
                for path in event.paths {
                    if !is_relevant(&filter, &git_dir, &path) {
                        continue;
                    }
                    if batcher.add(path, Instant::now()) && !flush(&mut batcher) {
                        return;
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("Watch error: {}", e);
                // Continue watching despite errors
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if !batcher.is_empty() {
                    flush(&mut batcher);
                }
                debug!("Tree watcher stopped");
                return;
            }
        }

        if batcher.is_ready(Instant::now()) && !flush(&mut batcher) {
            return;
        }
    }
}
