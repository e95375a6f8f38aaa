//! Process-wide admission counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::engine::Decision;

/// Running totals of admission decisions and evictions.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
    allowed: AtomicU64,
    rejected_too_soon: AtomicU64,
    rejected_blacklisted: AtomicU64,
    swept_records: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub allowed: u64,
    pub rejected_too_soon: u64,
    pub rejected_blacklisted: u64,
    pub swept_records: u64,
}

impl AdmissionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&self, decision: Decision) {
        let counter = match decision {
            Decision::Allow => &self.allowed,
            Decision::RejectTooSoon => &self.rejected_too_soon,
            Decision::RejectBlacklisted => &self.rejected_blacklisted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self, removed: usize) {
        self.swept_records.fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let allowed = self.allowed.load(Ordering::Relaxed);
        let rejected_too_soon = self.rejected_too_soon.load(Ordering::Relaxed);
        let rejected_blacklisted = self.rejected_blacklisted.load(Ordering::Relaxed);
        MetricsSnapshot {
            total_requests: allowed + rejected_too_soon + rejected_blacklisted,
            allowed,
            rejected_too_soon,
            rejected_blacklisted,
            swept_records: self.swept_records.load(Ordering::Relaxed),
        }
    }
}
