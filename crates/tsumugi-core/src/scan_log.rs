//! Structured scan diagnostics.
//!
//! An ordered, bounded log of per-path messages collected during one
//! reconciliation run, handed to the caller when the session closes.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default maximum number of retained entries.
pub const DEFAULT_LOG_CAPACITY: usize = 2048;

/// One diagnostic line tied to a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    pub path: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded ordered log; the oldest entry is evicted at capacity.
#[derive(Debug)]
pub struct ScanLog {
    entries: VecDeque<ScanLogEntry>,
    capacity: usize,
}

impl Default for ScanLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl ScanLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    /// Append an entry, evicting the oldest if at capacity.
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ScanLogEntry {
            path: path.into(),
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    /// Snapshot of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<ScanLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
