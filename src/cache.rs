//! In-memory snapshot cache keyed by root and branch.
//!
//! Each root carries an epoch that [`SnapshotCache::invalidate`] bumps. A build
//! records the epoch it started under and [`SnapshotCache::put_if_current`]
//! refuses the result once the epoch has moved on, so a walk that raced an
//! invalidation can never reinstate a stale tree.

use crate::snapshot::{RootRequest, Snapshot};
use crate::tree::hasher::TreeFingerprint;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Epoch of a root at the time a build began
pub type Epoch = u64;

#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<RootRequest, Arc<Snapshot>>,
    epochs: HashMap<PathBuf, Epoch>,
    /// Every root ever requested, kept across invalidations
    tracked: BTreeSet<PathBuf>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, request: &RootRequest) -> Option<Arc<Snapshot>> {
        self.entries.get(request).cloned()
    }

    /// Store a snapshot unconditionally, replacing any previous one for the key.
    pub fn put(&mut self, request: RootRequest, snapshot: Arc<Snapshot>) {
        self.tracked.insert(request.root.clone());
        self.entries.insert(request, snapshot);
    }

    /// Store a snapshot only if its root has not been invalidated since `epoch`.
    ///
    /// Returns whether the snapshot was stored.
    pub fn put_if_current(
        &mut self,
        request: RootRequest,
        snapshot: Arc<Snapshot>,
        epoch: Epoch,
    ) -> bool {
        if self.epoch(&request.root) != epoch {
            debug!(
                root = %request.root.display(),
                sequence = snapshot.sequence,
                "Discarding build that raced an invalidation"
            );
            return false;
        }
        self.put(request, snapshot);
        true
    }

    /// Drop every snapshot for `root`, whatever branch it was built under.
    ///
    /// Returns the number of snapshots dropped.
    pub fn invalidate(&mut self, root: &Path) -> usize {
        *self.epochs.entry(root.to_path_buf()).or_insert(0) += 1;
        let before = self.entries.len();
        self.entries.retain(|key, _| key.root != root);
        before - self.entries.len()
    }

    /// Current epoch of `root`.
    pub fn epoch(&self, root: &Path) -> Epoch {
        self.epochs.get(root).copied().unwrap_or(0)
    }

    /// Start tracking `root` so branch changes refresh it even before it is cached.
    pub fn track(&mut self, root: &Path) {
        self.tracked.insert(root.to_path_buf());
    }

    /// Roots that have been requested, in path order.
    pub fn tracked_roots(&self) -> Vec<PathBuf> {
        self.tracked.iter().cloned().collect()
    }

    /// Most recent snapshot for `root` under any branch.
    pub fn latest_for_root(&self, root: &Path) -> Option<Arc<Snapshot>> {
        self.entries
            .iter()
            .filter(|(key, _)| key.root == root)
            .map(|(_, snapshot)| snapshot)
            .max_by_key(|snapshot| snapshot.sequence)
            .cloned()
    }

    /// Whether `fingerprint` differs from the snapshot cached for `request`.
    ///
    /// An uncached request counts as changed.
    pub fn has_changed(&self, request: &RootRequest, fingerprint: &TreeFingerprint) -> bool {
        self.entries
            .get(request)
            .map_or(true, |snapshot| &snapshot.fingerprint != fingerprint)
    }
}
