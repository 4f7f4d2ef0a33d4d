//! Error types for the branchtree snapshot service.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`WalkError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkErrorKind {
    RootNotFound,
    PermissionDenied,
    CyclicLink,
    AliasedLink,
    Io,
    BuildAborted,
}

/// Tree walk errors
///
/// `Clone` so that one coalesced build result can be handed to every waiting caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkError {
    #[error("Root not found or not a directory: {0}")]
    RootNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Cyclic symbolic link: {link} resolves to its ancestor {target}")]
    CyclicLink { link: PathBuf, target: PathBuf },

    #[error("Aliased symbolic link: {link} resolves to {target}, already in the tree")]
    AliasedLink { link: PathBuf, target: PathBuf },

    #[error("Walk I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Build aborted: {0}")]
    BuildAborted(String),
}

impl WalkError {
    pub fn kind(&self) -> WalkErrorKind {
        match self {
            WalkError::RootNotFound(_) => WalkErrorKind::RootNotFound,
            WalkError::PermissionDenied(_) => WalkErrorKind::PermissionDenied,
            WalkError::CyclicLink { .. } => WalkErrorKind::CyclicLink,
            WalkError::AliasedLink { .. } => WalkErrorKind::AliasedLink,
            WalkError::Io { .. } => WalkErrorKind::Io,
            WalkError::BuildAborted(_) => WalkErrorKind::BuildAborted,
        }
    }

    /// Map an I/O failure on `path` into the matching walk error.
    pub fn from_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => WalkError::PermissionDenied(path),
            std::io::ErrorKind::NotFound => WalkError::RootNotFound(path),
            _ => WalkError::Io {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Whether the builder recovers from this error by omitting the entry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            WalkErrorKind::PermissionDenied
                | WalkErrorKind::CyclicLink
                | WalkErrorKind::AliasedLink
        )
    }
}

/// Watcher errors
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Failed to create watcher: {0}")]
    WatcherCreation(#[from] notify::Error),

    #[error("Failed to watch path {path}: {source}")]
    WatchPath {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("Notification stream closed; serving last good snapshots")]
    NotificationStreamClosed,
}

/// Errors surfaced through the [`crate::api::App`] facade and the CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Walk error: {0}")]
    Walk(#[from] WalkError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Change watcher task failed: {0}")]
    WatcherTask(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
