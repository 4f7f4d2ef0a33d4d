//! Tree builder for constructing ordered directory trees

use crate::error::WalkError;
use crate::filter::{EntryMeta, FilterConfig, PathFilter};
use crate::snapshot::{BuildReport, RootRequest, Snapshot};
use crate::tree::node::{sibling_order, FsNode};
use crate::tree::path;
use crate::tree::walker::{self, Entry};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, instrument, trace, warn};

/// Tree builder
///
/// Stateless between builds apart from the walk counter, so one builder can be
/// shared across threads.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    filter_config: FilterConfig,
    walks: AtomicU64,
}

/// Result of one walk
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub root: FsNode,
    pub report: BuildReport,
    /// Walk number, starting at 1
    pub sequence: u64,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set filter config (ignore patterns, size limit, etc.).
    pub fn with_filter_config(mut self, config: FilterConfig) -> Self {
        self.filter_config = config;
        self
    }

    pub fn filter_config(&self) -> &FilterConfig {
        &self.filter_config
    }

    /// Number of walks started so far.
    pub fn builds_started(&self) -> u64 {
        self.walks.load(Ordering::SeqCst)
    }

    /// Build the tree rooted at `root`
    ///
    /// Fails only when `root` is missing or not a directory. Unreadable entries
    /// and cyclic links are left out; use [`TreeBuilder::build_tree`] to see them.
    pub fn build(&self, root: &Path) -> Result<FsNode, WalkError> {
        self.build_tree(root).map(|built| built.root)
    }

    /// Build a snapshot for `request`, numbered with the walk's sequence.
    pub fn build_snapshot(&self, request: &RootRequest) -> Result<Snapshot, WalkError> {
        let built = self.build_tree(&request.root)?;
        Ok(Snapshot::new(
            request.clone(),
            built.sequence,
            built.root,
            built.report,
        ))
    }

    /// Walk `root` and return the tree together with what was skipped.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn build_tree(&self, root: &Path) -> Result<BuiltTree, WalkError> {
        let sequence = self.walks.fetch_add(1, Ordering::SeqCst) + 1;
        let start = Instant::now();
        info!(sequence, "Starting tree build");

        let is_dir = std::fs::metadata(root).map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            warn!("Root is missing or not a directory");
            return Err(WalkError::RootNotFound(root.to_path_buf()));
        }

        let filter = PathFilter::new(root, &self.filter_config);
        let mut walk = Walk {
            filter: &filter,
            visited: HashSet::new(),
            ancestors: Vec::new(),
            report: BuildReport::default(),
        };
        if let Ok(canonical_root) = path::canonicalize_path(root) {
            walk.visited.insert(canonical_root.clone());
            walk.ancestors.push(canonical_root);
        }

        // The root itself is the one directory whose listing failure is fatal
        let children = walk.walk_dir(root)?;
        let tree = FsNode::directory(root.to_path_buf(), children);
        let report = walk.report;

        info!(
            sequence,
            node_count = tree.node_count(),
            skipped = report.skipped.len(),
            duration_ms = start.elapsed().as_millis(),
            "Tree build completed"
        );

        Ok(BuiltTree {
            root: tree,
            report,
            sequence,
        })
    }
}

/// State for a single depth-first walk
///
/// A linked directory is followed at most once per canonical target. A link
/// back to a directory on the current walk stack is a cycle; a link to one
/// already walked elsewhere is an alias. Listings are sorted by name, so the
/// first alias in that order is the one kept, on every build.
struct Walk<'a> {
    filter: &'a PathFilter,
    /// Canonical paths of directories entered during this walk
    visited: HashSet<PathBuf>,
    /// Canonical paths of the directories being walked, root first
    ancestors: Vec<PathBuf>,
    report: BuildReport,
}

impl Walk<'_> {
    fn walk_dir(&mut self, dir: &Path) -> Result<Vec<FsNode>, WalkError> {
        let listing = walker::list_dir(dir)?;
        for err in listing.skipped {
            warn!(error = %err, "Omitting unreadable entry");
            self.report.record(err);
        }

        let mut children = Vec::with_capacity(listing.entries.len());
        for entry in listing.entries {
            let name = entry
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let meta = EntryMeta {
                path: entry.path(),
                name: &name,
                is_dir: entry.is_dir(),
                size: entry.size(),
            };
            if !self.filter.should_include(&meta) {
                trace!(path = %entry.path().display(), "Filtered");
                continue;
            }

            match entry {
                Entry::File { path, .. } => children.push(FsNode::file(path)),
                Entry::Directory { path } => {
                    let canonical = path::canonicalize_path(&path).ok();
                    if let Some(canonical) = &canonical {
                        self.visited.insert(canonical.clone());
                    }
                    if let Some(node) = self.descend(path, canonical) {
                        children.push(node);
                    }
                }
                Entry::LinkedDirectory { path, target } => {
                    if self.ancestors.contains(&target) {
                        let err = WalkError::CyclicLink { link: path, target };
                        warn!(error = %err, "Omitting cyclic link");
                        self.report.record(err);
                        continue;
                    }
                    if !self.visited.insert(target.clone()) {
                        let err = WalkError::AliasedLink { link: path, target };
                        debug!(error = %err, "Omitting aliased link");
                        self.report.record(err);
                        continue;
                    }
                    debug!(link = %path.display(), target = %target.display(), "Following link");
                    if let Some(node) = self.descend(path, Some(target)) {
                        children.push(node);
                    }
                }
            }
        }

        children.sort_by(sibling_order);
        Ok(children)
    }

    /// Walk a subdirectory; a failure omits only that subtree.
    fn descend(&mut self, path: PathBuf, canonical: Option<PathBuf>) -> Option<FsNode> {
        let entered = canonical.map(|c| self.ancestors.push(c)).is_some();
        let result = self.walk_dir(&path);
        if entered {
            self.ancestors.pop();
        }
        match result {
            Ok(children) => Some(FsNode::directory(path, children)),
            Err(err) => {
                if err.is_recoverable() {
                    warn!(error = %err, "Omitting unreadable directory");
                } else {
                    error!(error = %err, "Omitting directory after walk failure");
                }
                self.report.record(err);
                None
            }
        }
    }
}
