//! Concurrent per-client state storage.
//!
//! One [`ClientRecord`] per identifier, each behind its own mutex so
//! unrelated clients never contend. The map's shard locks only guard
//! insertion and removal; every read-modify-write of a record happens
//! under that record's lock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;

use crate::clock::Timestamp;
use crate::engine::ClientRecord;

/// Exclusively-lockable handle to one client's record.
pub type RecordHandle = Arc<Mutex<ClientRecord>>;

#[derive(Debug, Default)]
pub struct ClientTable {
    records: DashMap<String, RecordHandle>,
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for `identifier`, creating it on first contact.
    pub fn get_or_create(&self, identifier: &str) -> RecordHandle {
        let entry = self
            .records
            .entry(identifier.to_string())
            .or_default();
        Arc::clone(entry.value())
    }

    /// Remove `identifier` if it has been idle past `idle_threshold` and is
    /// not blacklisted. Returns whether a record was removed.
    ///
    /// Removal must never fork a client's state: a handle already cloned
    /// out by an in-flight admission keeps the record in the map, otherwise
    /// that admission would mutate an orphan while the next request gets a
    /// fresh record. `remove_if` holds the shard lock, so no new handle can
    /// be cloned out between the count check and the removal.
    pub fn remove_if_idle(
        &self,
        identifier: &str,
        now: Timestamp,
        idle_threshold: Duration,
    ) -> bool {
        self.records
            .remove_if(identifier, |_, handle| {
                if Arc::strong_count(handle) > 1 {
                    return false;
                }
                match handle.lock() {
                    Ok(record) => {
                        record.is_idle(now, idle_threshold) && !record.is_blacklisted(now)
                    }
                    // A poisoned record is unreadable; keep it rather than
                    // erase a possible blacklist.
                    Err(_) => false,
                }
            })
            .is_some()
    }

    /// Sweep the whole table, removing every idle, non-blacklisted record.
    /// Returns the number of records removed.
    pub fn sweep_idle(&self, now: Timestamp, idle_threshold: Duration) -> usize {
        let identifiers: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        identifiers
            .iter()
            .filter(|id| self.remove_if_idle(id, now, idle_threshold))
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
