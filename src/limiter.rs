//! The admission control front: table + clock + parameters.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::engine::{decide, AdmissionParams, Decision};
use crate::error::AdmissionError;
use crate::metrics::{AdmissionMetrics, MetricsSnapshot};
use crate::table::ClientTable;

/// Result of one admission check, with a retry hint for rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub decision: Decision,
    pub retry_after: Option<Duration>,
}

/// Process-wide admission control state.
///
/// Explicitly constructed and passed around rather than kept in a global, so
/// tests can run it against a [`ManualClock`] without real delays.
///
/// [`ManualClock`]: crate::clock::ManualClock
pub struct AdmissionControl {
    table: ClientTable,
    clock: Arc<dyn Clock>,
    params: AdmissionParams,
    metrics: AdmissionMetrics,
}

impl AdmissionControl {
    pub fn new(clock: Arc<dyn Clock>, params: AdmissionParams) -> Self {
        Self {
            table: ClientTable::new(),
            clock,
            params,
            metrics: AdmissionMetrics::new(),
        }
    }

    /// Decide whether a request from `identifier` is admitted.
    ///
    /// The clock is read before any state is touched; a clock failure aborts
    /// the check with the record unchanged. The record's lock is held only
    /// for the read-modify-write, never while logging.
    pub fn admit(&self, identifier: &str) -> Result<Outcome, AdmissionError> {
        let now = self.clock.now()?;
        let handle = self.table.get_or_create(identifier);

        let outcome = {
            let mut record = handle.lock().map_err(|_| AdmissionError::StatePoisoned {
                identifier: identifier.to_string(),
            })?;
            let decision = decide(&mut record, now, &self.params);
            let retry_after = match decision {
                Decision::Allow => None,
                Decision::RejectTooSoon => Some(self.params.min_interval),
                Decision::RejectBlacklisted => {
                    record.blacklisted_until.map(|until| until.saturating_sub(now))
                }
            };
            Outcome {
                decision,
                retry_after,
            }
        };

        self.metrics.record_decision(outcome.decision);
        tracing::info!(
            target: "turnstile::admission",
            identifier = %identifier,
            decision = %outcome.decision,
            timestamp_ms = now.as_millis() as u64,
            "admission decision"
        );
        Ok(outcome)
    }

    /// Evict idle, non-blacklisted records. Returns how many were removed.
    pub fn sweep_idle(&self) -> Result<usize, AdmissionError> {
        let now = self.clock.now()?;
        let removed = self.table.sweep_idle(now, self.params.idle_threshold);
        self.metrics.record_sweep(removed);
        Ok(removed)
    }

    pub fn params(&self) -> &AdmissionParams {
        &self.params
    }

    pub fn tracked_clients(&self) -> usize {
        self.table.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
