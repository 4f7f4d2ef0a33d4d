//! Branch identity and the process-wide current-branch signal.
//!
//! The branch id is opaque: it is only ever compared, hashed and echoed back in
//! events. The one piece of repository layout this crate knows is where the
//! `HEAD` file lives and what a symbolic ref line looks like.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const SYMBOLIC_REF_PREFIX: &str = "ref: ";

/// Opaque branch identity used as part of the cache key
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BranchId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BranchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Current branch, shared between the watcher (writer) and the query service (reader)
#[derive(Debug, Default)]
pub struct BranchSignal {
    current: RwLock<BranchId>,
}

impl BranchSignal {
    /// Starts empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> BranchId {
        self.current.read().clone()
    }

    /// Replace the current branch. Returns the previous value.
    pub fn set(&self, branch: BranchId) -> BranchId {
        std::mem::replace(&mut *self.current.write(), branch)
    }
}

/// Location of the `HEAD` file for a repository working directory.
pub fn head_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".git").join("HEAD")
}

/// Parse the contents of a `HEAD` file into a branch id
///
/// `ref: refs/heads/main` yields `refs/heads/main`; a detached head yields the
/// commit hash. Blank content yields `None`.
pub fn parse_head(contents: &str) -> Option<BranchId> {
    let line = contents.trim();
    if line.is_empty() {
        return None;
    }
    let id = line.strip_prefix(SYMBOLIC_REF_PREFIX).unwrap_or(line).trim();
    if id.is_empty() {
        None
    } else {
        Some(BranchId::new(id))
    }
}

/// Read and parse the `HEAD` file of `repo_root`.
pub fn read_head(repo_root: &Path) -> std::io::Result<Option<BranchId>> {
    let contents = std::fs::read_to_string(head_path(repo_root))?;
    Ok(parse_head(&contents))
}
