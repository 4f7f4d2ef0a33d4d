//! Query Service
//!
//! The facade the presentation layer reads trees through. Pull-style reads go
//! through [`QueryService::read_folder`]; watcher-driven refreshes are pushed to
//! every [`QueryService::subscribe`]r as [`TreeEvent`]s.
//!
//! Per root the service moves Uncached → Building → Cached → Stale (branch
//! change or filesystem mutation) → Building → Cached. Concurrent reads of the
//! same `(root, branch)` share one in-flight walk.

use crate::branch::{BranchId, BranchSignal};
use crate::cache::{Epoch, SnapshotCache};
use crate::error::WalkError;
use crate::snapshot::{RootRequest, Snapshot};
use crate::tree::builder::TreeBuilder;
use crate::tree::path;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, trace, warn};

/// Default capacity of the subscriber channel
pub const DEFAULT_EVENT_BUFFER: usize = 64;

type BuildResult = Result<Arc<Snapshot>, WalkError>;
type SharedBuild = Shared<BoxFuture<'static, BuildResult>>;

/// Events pushed to subscribers
///
/// Serialized as `{"event": "branch-checkout", "payload": "<branch>"}` and
/// `{"event": "tree-refreshed", "payload": {...snapshot...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum TreeEvent {
    BranchCheckout(BranchId),
    TreeRefreshed(Arc<Snapshot>),
}

struct InFlight {
    epoch: Epoch,
    build: SharedBuild,
}

#[derive(Default)]
struct State {
    cache: SnapshotCache,
    in_flight: HashMap<RootRequest, InFlight>,
}

impl State {
    fn invalidate(&mut self, root: &Path) -> usize {
        self.in_flight.retain(|key, _| key.root != root);
        self.cache.invalidate(root)
    }
}

/// Query service
pub struct QueryService {
    builder: Arc<TreeBuilder>,
    branch: Arc<BranchSignal>,
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<TreeEvent>,
    degraded: AtomicBool,
}

impl QueryService {
    pub fn new(builder: TreeBuilder) -> Self {
        Self::with_event_buffer(builder, DEFAULT_EVENT_BUFFER)
    }

    pub fn with_event_buffer(builder: TreeBuilder, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            builder: Arc::new(builder),
            branch: Arc::new(BranchSignal::new()),
            state: Arc::new(Mutex::new(State::default())),
            events,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn builder(&self) -> &TreeBuilder {
        &self.builder
    }

    pub fn current_branch(&self) -> BranchId {
        self.branch.current()
    }

    /// Read the tree for `root` under the current branch
    ///
    /// Serves the cached snapshot when there is one; otherwise joins the
    /// in-flight build for the same key, or starts one.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn read_folder(&self, root: &Path) -> BuildResult {
        let root = path::normalize_root(root)?;

        let build = {
            let mut state = self.state.lock();
            // Branch is read under the cache lock so a concurrent checkout is
            // either fully before or fully after this lookup
            let request = RootRequest {
                root,
                branch: self.branch.current(),
            };
            state.cache.track(&request.root);

            if let Some(snapshot) = state.cache.get(&request) {
                trace!(sequence = snapshot.sequence, "Cache hit");
                return Ok(snapshot);
            }

            if let Some(in_flight) = state.in_flight.get(&request) {
                debug!("Joining in-flight build");
                in_flight.build.clone()
            } else {
                let epoch = state.cache.epoch(&request.root);
                let build = self.start_build(request.clone(), epoch);
                state.in_flight.insert(
                    request,
                    InFlight {
                        epoch,
                        build: build.clone(),
                    },
                );
                build
            }
        };

        build.await
    }

    /// Spawn a walk on the blocking pool and publish its result to the cache.
    ///
    /// Publication happens on the worker, so it completes even if every caller
    /// stops waiting.
    fn start_build(&self, request: RootRequest, epoch: Epoch) -> SharedBuild {
        let builder = Arc::clone(&self.builder);
        let state = Arc::clone(&self.state);

        let handle = tokio::task::spawn_blocking(move || {
            let result = builder.build_snapshot(&request).map(Arc::new);

            let mut state = state.lock();
            if state
                .in_flight
                .get(&request)
                .is_some_and(|in_flight| in_flight.epoch == epoch)
            {
                state.in_flight.remove(&request);
            }
            if let Ok(snapshot) = &result {
                state
                    .cache
                    .put_if_current(request, Arc::clone(snapshot), epoch);
            }
            result
        });

        handle
            .map(|joined| {
                joined.unwrap_or_else(|e| Err(WalkError::BuildAborted(e.to_string())))
            })
            .boxed()
            .shared()
    }

    /// Rebuild `root` and push the result only if the tree changed
    ///
    /// Used for filesystem mutations. Returns the new snapshot when it replaced
    /// the cached one, `None` when the tree is unchanged or a branch change
    /// overtook the rebuild.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn refresh(&self, root: &Path) -> Result<Option<Arc<Snapshot>>, WalkError> {
        let root = path::normalize_root(root)?;
        let (request, epoch) = {
            let mut state = self.state.lock();
            state.cache.track(&root);
            let epoch = state.cache.epoch(&root);
            (
                RootRequest {
                    root,
                    branch: self.branch.current(),
                },
                epoch,
            )
        };

        let builder = Arc::clone(&self.builder);
        let build_request = request.clone();
        let built = tokio::task::spawn_blocking(move || builder.build_snapshot(&build_request))
            .await
            .map_err(|e| WalkError::BuildAborted(e.to_string()))
            .and_then(|result| result);
        let snapshot = match built {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                // The cached tree no longer matches the disk; the next read walks again
                let mut state = self.state.lock();
                if state.cache.epoch(&request.root) == epoch {
                    state.invalidate(&request.root);
                }
                warn!(error = %err, "Refresh failed; cached tree dropped");
                return Err(err);
            }
        };

        {
            let mut state = self.state.lock();
            if state.cache.epoch(&request.root) != epoch {
                debug!("Refresh overtaken by invalidation");
                return Ok(None);
            }
            if !state.cache.has_changed(&request, &snapshot.fingerprint) {
                trace!("Tree unchanged");
                return Ok(None);
            }
            // Snapshots of other branches saw the old filesystem too
            state.invalidate(&request.root);
            let epoch = state.cache.epoch(&request.root);
            state
                .cache
                .put_if_current(request, Arc::clone(&snapshot), epoch);
        }

        info!(sequence = snapshot.sequence, fingerprint = %snapshot.fingerprint, "Tree changed");
        self.publish(TreeEvent::TreeRefreshed(Arc::clone(&snapshot)));
        Ok(Some(snapshot))
    }

    /// Switch the current branch and mark every tracked root stale
    ///
    /// Returns the roots that need a fresh tree pushed.
    pub fn switch_branch(&self, branch: BranchId) -> Vec<PathBuf> {
        let mut state = self.state.lock();
        let previous = self.branch.set(branch.clone());
        let roots = state.cache.tracked_roots();
        for root in &roots {
            state.invalidate(root);
        }
        info!(
            previous = %previous,
            branch = %branch,
            roots = roots.len(),
            "Branch switched"
        );
        roots
    }

    /// Drop cached snapshots for `root` under every branch.
    pub fn invalidate(&self, root: &Path) -> usize {
        let root = match path::normalize_root(root) {
            Ok(root) => root,
            Err(_) => root.to_path_buf(),
        };
        self.state.lock().invalidate(&root)
    }

    /// Build (or reuse) the tree for `root` and push it to subscribers.
    pub async fn push_fresh(&self, root: &Path) -> BuildResult {
        let snapshot = self.read_folder(root).await?;
        self.publish(TreeEvent::TreeRefreshed(Arc::clone(&snapshot)));
        Ok(snapshot)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, event: TreeEvent) {
        if self.events.send(event).is_err() {
            trace!("No subscribers for tree event");
        }
    }

    /// Roots whose trees have been requested.
    pub fn tracked_roots(&self) -> Vec<PathBuf> {
        self.state.lock().cache.tracked_roots()
    }

    /// Newest cached snapshot for `root` under any branch.
    pub fn last_good(&self, root: &Path) -> Option<Arc<Snapshot>> {
        let root = path::normalize_root(root).ok()?;
        self.state.lock().cache.latest_for_root(&root)
    }

    pub fn mark_degraded(&self) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!("Change notifications stopped; serving cached trees until restart");
        }
    }

    /// Whether change notifications have stopped.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }
}
