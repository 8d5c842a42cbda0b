//! Identification history ledger
//!
//! Bounded append log of every completed identification, newest first.
//! History reflects activity, not species identity: the same species may
//! appear many times, and there is deliberately no dedup here.

use serde::{Deserialize, Serialize};

use crate::types::IdentificationRecord;

/// Maximum number of retained history entries
pub const HISTORY_CAPACITY: usize = 50;

/// Ordered, capacity-bounded identification log
///
/// Serialized as a bare JSON array, head = newest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger {
    entries: Vec<IdentificationRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed identification at the head
    ///
    /// When the ledger is full the oldest (tail) entry is evicted; the
    /// length never exceeds `HISTORY_CAPACITY`.
    pub fn record(&mut self, entry: IdentificationRecord) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAPACITY);
    }

    /// Entries newest-to-oldest
    pub fn list(&self) -> &[IdentificationRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
