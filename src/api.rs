//! App Facade
//!
//! The call surface the presentation layer binds to: `read_folder`,
//! `get_app_config`, a [`TreeEvent`] subscription, and `start_watching` which
//! wires the repository's `HEAD` and working tree into the query service.

use crate::config::ApplicationConfig;
use crate::error::{ApiError, WatchError};
use crate::service::{QueryService, TreeEvent};
use crate::snapshot::Snapshot;
use crate::tree::builder::TreeBuilder;
use crate::tree::node::FsNode;
use crate::tree::path;
use crate::watch::{self, ChangeWatcher, HeadWatcher, TreeWatcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub struct App {
    config: ApplicationConfig,
    service: Arc<QueryService>,
}

impl App {
    pub fn new(config: ApplicationConfig) -> Self {
        let builder = TreeBuilder::new().with_filter_config(config.effective_filter());
        let service = QueryService::with_event_buffer(builder, config.watch.event_buffer);
        Self {
            config,
            service: Arc::new(service),
        }
    }

    /// Tree for `root` under the current branch.
    pub async fn read_folder(&self, root: &Path) -> Result<FsNode, ApiError> {
        Ok(self.read_snapshot(root).await?.root.clone())
    }

    /// Like [`App::read_folder`] but keeps the snapshot metadata.
    pub async fn read_snapshot(&self, root: &Path) -> Result<Arc<Snapshot>, ApiError> {
        Ok(self.service.read_folder(root).await?)
    }

    /// The configuration the app was started with.
    pub fn get_app_config(&self) -> ApplicationConfig {
        self.config.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.service.subscribe()
    }

    pub fn service(&self) -> &Arc<QueryService> {
        &self.service
    }

    /// Absolute repository root from the configuration.
    pub fn repository_root(&self) -> Result<PathBuf, ApiError> {
        Ok(path::normalize_root(&self.config.repository.path)?)
    }

    /// Start watching the repository for checkouts and file changes
    ///
    /// Must be called from within a tokio runtime. The current branch is set
    /// from `HEAD` before this returns. A repository without `.git` is watched
    /// for file changes only. Watching stops when the handle is dropped or
    /// [`WatchHandle::stop`] is awaited.
    pub fn start_watching(&self) -> Result<WatchHandle, ApiError> {
        let repo_root = self.repository_root()?;
        let (tx, change_watcher) = ChangeWatcher::channel(Arc::clone(&self.service));

        let head = if repo_root.join(".git").is_dir() {
            let head = HeadWatcher::spawn(&repo_root, tx.clone())?;
            if let Some(branch) = head.initial_branch() {
                self.service.switch_branch(branch.clone());
            }
            Some(head)
        } else {
            warn!(repo = %repo_root.display(), "No .git directory; branch changes will not be seen");
            None
        };

        let tree = TreeWatcher::spawn(
            &repo_root,
            &self.config.effective_filter(),
            &self.config.watch,
            tx,
        )?;

        let task = tokio::spawn(change_watcher.run());
        info!(repo = %repo_root.display(), "Watching repository");

        Ok(WatchHandle {
            head,
            tree: Some(tree),
            task,
        })
    }
}

/// Keeps the repository watchers alive
pub struct WatchHandle {
    head: Option<HeadWatcher>,
    tree: Option<TreeWatcher>,
    task: JoinHandle<Result<(), WatchError>>,
}

impl WatchHandle {
    /// Stop both watchers and wait for pending events to drain.
    pub async fn stop(mut self) -> Result<(), ApiError> {
        self.head.take();
        self.tree.take();
        let result = (&mut self.task)
            .await
            .map_err(|e| ApiError::WatcherTask(e.to_string()))?;
        if watch::is_stream_closed(&result) {
            Ok(())
        } else {
            result.map_err(ApiError::from)
        }
    }
}
