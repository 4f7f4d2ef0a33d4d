//! Visibility rules for tree entries.
//!
//! A [`PathFilter`] is compiled once per build from the [`FilterConfig`] and,
//! when enabled, the root's `.gitignore`. Reading `.gitignore` at build time
//! means a branch checkout that changes the ignore file is picked up by the
//! rebuild that follows it.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Filter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Gitignore-syntax patterns applied relative to the root
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Also apply the root's `.gitignore`
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Show entries whose name starts with a dot
    #[serde(default = "default_true")]
    pub show_hidden: bool,

    /// Files at or above this size (bytes) are hidden; 0 disables the limit
    #[serde(default)]
    pub max_file_size: u64,
}

fn default_ignore_patterns() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: default_ignore_patterns(),
            respect_gitignore: true,
            show_hidden: true,
            max_file_size: 0,
        }
    }
}

/// Metadata the filter decides on
#[derive(Debug, Clone, Copy)]
pub struct EntryMeta<'a> {
    pub path: &'a Path,
    pub name: &'a str,
    pub is_dir: bool,
    /// File size in bytes; 0 for directories
    pub size: u64,
}

/// Compiled visibility rules for one root
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    matcher: Gitignore,
    show_hidden: bool,
    max_file_size: u64,
}

impl PathFilter {
    /// Compile the filter for `root`
    ///
    /// Invalid patterns are logged and skipped rather than failing the build.
    pub fn new(root: &Path, config: &FilterConfig) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in &config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                warn!(pattern = %pattern, error = %e, "Skipping invalid ignore pattern");
            }
        }

        if config.respect_gitignore {
            let gitignore = root.join(".gitignore");
            if gitignore.is_file() {
                if let Some(e) = builder.add(&gitignore) {
                    warn!(path = %gitignore.display(), error = %e, "Partially invalid .gitignore");
                }
            }
        }

        let matcher = match builder.build() {
            Ok(m) => m,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Failed to compile ignore rules");
                Gitignore::empty()
            }
        };

        Self {
            root: root.to_path_buf(),
            matcher,
            show_hidden: config.show_hidden,
            max_file_size: config.max_file_size,
        }
    }

    /// Decide whether an entry appears in the tree.
    ///
    /// Parents are assumed to have passed already; the builder never descends
    /// into an excluded directory.
    pub fn should_include(&self, entry: &EntryMeta<'_>) -> bool {
        if !self.show_hidden && entry.name.starts_with('.') {
            return false;
        }
        if !entry.is_dir && self.max_file_size > 0 && entry.size >= self.max_file_size {
            return false;
        }
        !self.matcher.matched(entry.path, entry.is_dir).is_ignore()
    }

    /// Whether an arbitrary path under the root is hidden by the rules,
    /// including through an ignored ancestor. Paths outside the root are ignored.
    pub fn is_ignored_path(&self, path: &Path, is_dir: bool) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }
        if !self.show_hidden
            && relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            return true;
        }
        self.matcher
            .matched_path_or_any_parents(relative, is_dir)
            .is_ignore()
    }
}
