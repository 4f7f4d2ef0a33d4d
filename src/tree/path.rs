//! Path canonicalization and normalization utilities

use crate::error::WalkError;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Resolve a path to its canonical on-disk location
///
/// Follows every symbolic link. Used as the identity of a directory in the
/// builder's cycle guard, never as a node path.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, WalkError> {
    dunce::canonicalize(path).map_err(|e| WalkError::from_io(path, &e))
}

/// Normalize a root path without touching the filesystem
///
/// This function:
/// 1. Makes relative paths absolute against the current directory
/// 2. Drops `.` components
/// 3. Normalizes Unicode to NFC
/// 4. Removes trailing slashes (except root)
///
/// Symbolic links are preserved so node paths keep the shape the caller asked for.
pub fn normalize_root(path: &Path) -> Result<PathBuf, WalkError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| WalkError::from_io(path, &e))?;
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(PathBuf::from(normalize_path_string(
        &normalized.to_string_lossy(),
    )))
}

/// Normalize a path string (without filesystem access)
///
/// Unicode is composed to NFC so visually equal roots share one cache key.
pub fn normalize_path_string(path: &str) -> String {
    let mut result: String = path.nfc().collect();
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }
    result
}

/// Whether `path` is `root` or lies underneath it.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}
