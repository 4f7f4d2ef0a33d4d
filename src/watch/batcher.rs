//! Debounced batching of filesystem change paths

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Groups change paths until the filesystem has been quiet for the debounce window
///
/// Repeated events for one path collapse into one entry. A batch is also ready
/// as soon as it holds `max_batch_size` distinct paths.
#[derive(Debug)]
pub struct EventBatcher {
    debounce: Duration,
    max_batch_size: usize,
    pending: BTreeMap<PathBuf, Instant>,
    last_event: Option<Instant>,
}

impl EventBatcher {
    pub fn new(debounce: Duration, max_batch_size: usize) -> Self {
        Self {
            debounce,
            max_batch_size: max_batch_size.max(1),
            pending: BTreeMap::new(),
            last_event: None,
        }
    }

    /// Add a path seen at `now`.
    ///
    /// Returns true if the batch is full and should be taken immediately.
    pub fn add(&mut self, path: PathBuf, now: Instant) -> bool {
        // Latest event wins
        self.pending.insert(path, now);
        self.last_event = Some(now);
        self.pending.len() >= self.max_batch_size
    }

    /// Whether the pending batch has been quiet for the debounce window.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_event {
            Some(last) if !self.pending.is_empty() => now.duration_since(last) >= self.debounce,
            _ => false,
        }
    }

    /// Get and clear pending paths, in path order.
    pub fn take_batch(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        std::mem::take(&mut self.pending).into_keys().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
