//! Built tree snapshots and the requests that key them.

use crate::branch::BranchId;
use crate::error::{WalkError, WalkErrorKind};
use crate::tree::hasher::{self, TreeFingerprint};
use crate::tree::node::FsNode;
use crate::tree::path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to build: a normalized root path under a branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootRequest {
    pub root: PathBuf,
    pub branch: BranchId,
}

impl RootRequest {
    /// Normalize `root` so that equal directories produce equal keys.
    pub fn new(root: &Path, branch: BranchId) -> Result<Self, WalkError> {
        Ok(Self {
            root: path::normalize_root(root)?,
            branch,
        })
    }
}

/// An entry omitted from a build by local recovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    #[serde(serialize_with = "serialize_kind")]
    pub kind: WalkErrorKind,
    pub reason: String,
}

impl From<WalkError> for SkippedEntry {
    fn from(err: WalkError) -> Self {
        let path = match &err {
            WalkError::RootNotFound(p) | WalkError::PermissionDenied(p) => p.clone(),
            WalkError::CyclicLink { link, .. } | WalkError::AliasedLink { link, .. } => {
                link.clone()
            }
            WalkError::Io { path, .. } => path.clone(),
            WalkError::BuildAborted(_) => PathBuf::new(),
        };
        Self {
            path,
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

fn serialize_kind<S: serde::Serializer>(kind: &WalkErrorKind, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:?}", kind))
}

/// Entries a build recovered from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub skipped: Vec<SkippedEntry>,
}

impl BuildReport {
    pub fn record(&mut self, err: WalkError) {
        self.skipped.push(err.into());
    }

    pub fn count(&self, kind: WalkErrorKind) -> usize {
        self.skipped.iter().filter(|s| s.kind == kind).count()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// One immutable built tree
///
/// Identity is `(request, sequence)`; nodes inside are identified by path.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub request: RootRequest,
    /// Monotonic across all builds made by one builder
    pub sequence: u64,
    pub fingerprint: TreeFingerprint,
    pub built_at: DateTime<Utc>,
    pub root: FsNode,
    pub report: BuildReport,
}

impl Snapshot {
    pub fn new(request: RootRequest, sequence: u64, root: FsNode, report: BuildReport) -> Self {
        Self {
            fingerprint: hasher::fingerprint(&root),
            request,
            sequence,
            built_at: Utc::now(),
            root,
            report,
        }
    }

    pub fn tree(&self) -> &FsNode {
        &self.root
    }
}
