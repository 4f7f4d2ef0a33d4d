//! Single-directory listing used by the tree builder

use crate::error::WalkError;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// Filesystem entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A regular file (or a link resolving to one) with its size
    File { path: PathBuf, size: u64 },
    /// A real directory
    Directory { path: PathBuf },
    /// A symbolic link resolving to a directory
    LinkedDirectory { path: PathBuf, target: PathBuf },
}

impl Entry {
    pub fn path(&self) -> &Path {
        match self {
            Entry::File { path, .. }
            | Entry::Directory { path }
            | Entry::LinkedDirectory { path, .. } => path,
        }
    }

    pub fn is_dir(&self) -> bool {
        !matches!(self, Entry::File { .. })
    }

    pub fn size(&self) -> u64 {
        match self {
            Entry::File { size, .. } => *size,
            _ => 0,
        }
    }
}

/// Outcome of listing one directory
#[derive(Debug, Default)]
pub struct Listing {
    /// Readable entries, sorted by file name
    pub entries: Vec<Entry>,
    /// Entries that could not be read, with the reason
    pub skipped: Vec<WalkError>,
}

/// List the immediate entries of `dir` without following links
///
/// Fails only when `dir` itself cannot be read. Entries whose metadata cannot be
/// read, dangling links and special files are reported in [`Listing::skipped`]
/// or dropped; they never fail the listing.
pub fn list_dir(dir: &Path) -> Result<Listing, WalkError> {
    // Surface an unreadable directory as an error on the directory itself
    std::fs::read_dir(dir).map_err(|e| WalkError::from_io(dir, &e))?;

    let mut listing = Listing::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                let err = match e.io_error() {
                    Some(io) => WalkError::from_io(path, io),
                    None => WalkError::Io {
                        path,
                        message: e.to_string(),
                    },
                };
                listing.skipped.push(err);
                continue;
            }
        };

        let path = entry.path().to_path_buf();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            listing.entries.push(Entry::Directory { path });
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(meta) => listing.entries.push(Entry::File {
                    path,
                    size: meta.len(),
                }),
                Err(e) => listing.skipped.push(match e.io_error() {
                    Some(io) => WalkError::from_io(path, io),
                    None => WalkError::Io {
                        path,
                        message: e.to_string(),
                    },
                }),
            }
        } else if file_type.is_symlink() {
            // std::fs::metadata follows the link
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => match dunce::canonicalize(&path) {
                    Ok(target) => listing.entries.push(Entry::LinkedDirectory { path, target }),
                    Err(e) => listing.skipped.push(WalkError::from_io(path, &e)),
                },
                Ok(meta) if meta.is_file() => listing.entries.push(Entry::File {
                    path,
                    size: meta.len(),
                }),
                Ok(_) => trace!(path = %path.display(), "Skipping link to special file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    trace!(path = %path.display(), "Skipping dangling link");
                }
                Err(e) => listing.skipped.push(WalkError::from_io(path, &e)),
            }
        } else {
            trace!(path = %path.display(), "Skipping special file");
        }
    }

    Ok(listing)
}
