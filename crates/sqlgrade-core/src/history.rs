//! Bounded, ordered query history
//!
//! The store is the only mutable state shared between requests. All three
//! operations take the same lock, so a reader never sees a list halfway
//! through an eviction.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OptionsError;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    /// Monotonic insertion ordinal; survives `clear`.
    pub inserted_at: u64,
}

#[derive(Debug, Default)]
struct HistoryLog {
    /// Oldest at the front, newest at the back.
    entries: VecDeque<HistoryEntry>,
    next_ordinal: u64,
}

#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    log: RwLock<HistoryLog>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Result<Self, OptionsError> {
        if capacity == 0 {
            return Err(OptionsError::invalid("historyCapacity", "must be at least 1"));
        }
        Ok(Self {
            capacity,
            log: RwLock::new(HistoryLog {
                entries: VecDeque::with_capacity(capacity),
                next_ordinal: 0,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `text` unless it repeats the most recent entry. Returns whether
    /// a new entry was stored. The oldest entry is evicted when full.
    pub fn record(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        let mut log = self.log.write().unwrap_or_else(PoisonError::into_inner);

        if log.entries.back().is_some_and(|last| last.text == text) {
            return false;
        }

        if log.entries.len() == self.capacity {
            if let Some(evicted) = log.entries.pop_front() {
                debug!(ordinal = evicted.inserted_at, "evicted oldest history entry");
            }
        }

        let inserted_at = log.next_ordinal;
        log.next_ordinal += 1;
        log.entries.push_back(HistoryEntry { text, inserted_at });
        true
    }

    /// Snapshot, most recent first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        let log = self.log.read().unwrap_or_else(PoisonError::into_inner);
        log.entries.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.log
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut log = self.log.write().unwrap_or_else(PoisonError::into_inner);
        log.entries.clear();
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            log: RwLock::new(HistoryLog::default()),
        }
    }
}
