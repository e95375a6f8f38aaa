//! Admission decision engine.
//!
//! A pure per-client state machine with three states: a client is *fresh*
//! when its requests are properly spaced, *limited* once it has sent
//! requests closer together than `min_interval`, and *blacklisted* after
//! enough consecutive violations. The engine only looks at a single
//! [`ClientRecord`] and an arrival time; locking, logging, and response
//! mapping live elsewhere.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Spacing satisfied, forward the request.
    Allow,
    /// Request arrived sooner than `min_interval` after the last accepted one.
    RejectTooSoon,
    /// Client is inside a blacklist window.
    RejectBlacklisted,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::RejectTooSoon => "reject_too_soon",
            Decision::RejectBlacklisted => "reject_blacklisted",
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunable parameters of the state machine.
///
/// All five knobs are part of the public configuration surface; anything
/// else in a config file is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdmissionParams {
    /// Minimum spacing between accepted requests from one client.
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,
    /// Consecutive too-soon requests before a client is blacklisted.
    pub violation_threshold: u32,
    /// How long a blacklisted client stays blacklisted.
    #[serde(with = "humantime_serde")]
    pub blacklist_duration: Duration,
    /// Violations are forgotten after this long without a new one.
    #[serde(with = "humantime_serde")]
    pub violation_decay: Duration,
    /// Clients idle for longer than this are eligible for eviction.
    #[serde(with = "humantime_serde")]
    pub idle_threshold: Duration,
}

impl Default for AdmissionParams {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(1),
            violation_threshold: 5,
            blacklist_duration: Duration::from_secs(10),
            violation_decay: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(300),
        }
    }
}

impl AdmissionParams {
    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_interval.is_zero() {
            return Err("min_interval must be greater than zero".to_string());
        }
        if self.violation_threshold == 0 {
            return Err("violation_threshold must be at least 1".to_string());
        }
        if self.blacklist_duration.is_zero() {
            return Err("blacklist_duration must be greater than zero".to_string());
        }
        if self.violation_decay.is_zero() {
            return Err("violation_decay must be greater than zero".to_string());
        }
        if self.idle_threshold.is_zero() {
            return Err("idle_threshold must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Per-client admission state, one record per identifier.
///
/// Records are created lazily on first contact and mutated only through
/// [`decide`] while the owner holds that identifier's lock.
#[derive(Debug, Clone, Default)]
pub struct ClientRecord {
    /// When the most recent *accepted* request arrived.
    pub last_request_at: Option<Timestamp>,
    /// Too-soon requests since the last reset.
    pub violation_count: u32,
    /// End of the current blacklist window, if any.
    pub blacklisted_until: Option<Timestamp>,
    /// When the most recent violation occurred, for decay.
    pub last_violation_at: Option<Timestamp>,
}

impl ClientRecord {
    pub fn is_blacklisted(&self, now: Timestamp) -> bool {
        self.blacklisted_until.is_some_and(|until| now < until)
    }

    /// Whether the record has seen no accepted request for `idle_threshold`.
    pub fn is_idle(&self, now: Timestamp, idle_threshold: Duration) -> bool {
        let last = self.last_request_at.unwrap_or_default();
        now.saturating_sub(last) > idle_threshold
    }
}

/// Run one admission step for `record` at arrival time `now`.
///
/// An active blacklist rejects without touching the record, so probing a
/// blacklisted client never extends its cooldown. An expired blacklist is
/// cleared and the request re-evaluated as if the client were fresh. The
/// request that trips `violation_threshold` is itself rejected.
///
/// Intervals are computed with saturating subtraction: a time source that
/// jumps backwards reads as a zero-length gap, never an under/overflow.
pub fn decide(record: &mut ClientRecord, now: Timestamp, params: &AdmissionParams) -> Decision {
    if let Some(until) = record.blacklisted_until {
        if now < until {
            return Decision::RejectBlacklisted;
        }
        record.blacklisted_until = None;
        record.violation_count = 0;
        record.last_violation_at = None;
    }

    if let Some(last) = record.last_request_at {
        if now.saturating_sub(last) < params.min_interval {
            record.violation_count += 1;
            record.last_violation_at = Some(now);
            if record.violation_count >= params.violation_threshold {
                record.blacklisted_until = Some(now + params.blacklist_duration);
                record.violation_count = 0;
            }
            return Decision::RejectTooSoon;
        }
    }

    if let Some(at) = record.last_violation_at {
        if now.saturating_sub(at) >= params.violation_decay {
            record.violation_count = 0;
            record.last_violation_at = None;
        }
    }
    record.last_request_at = Some(now);
    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(threshold: u32) -> AdmissionParams {
        AdmissionParams {
            min_interval: Duration::from_secs(1),
            violation_threshold: threshold,
            blacklist_duration: Duration::from_secs(10),
            violation_decay: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(300),
        }
    }

    fn secs(s: f64) -> Timestamp {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn first_request_is_always_allowed() {
        let p = params(5);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(1234.5), &p), Decision::Allow);
        assert_eq!(record.last_request_at, Some(secs(1234.5)));
    }

    #[test]
    fn properly_spaced_requests_are_all_allowed() {
        let p = params(5);
        let mut record = ClientRecord::default();
        for i in 0..20 {
            let t = secs(i as f64 * 1.5);
            assert_eq!(decide(&mut record, t, &p), Decision::Allow, "request {i}");
        }
        assert_eq!(record.violation_count, 0);
        assert!(record.blacklisted_until.is_none());
    }

    #[test]
    fn spacing_at_exactly_min_interval_is_allowed() {
        let p = params(5);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);
        assert_eq!(decide(&mut record, secs(1.0), &p), Decision::Allow);
    }

    #[test]
    fn burst_of_threshold_violations_blacklists() {
        let p = params(5);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);

        for i in 1..=5u32 {
            let t = secs(i as f64 * 0.1);
            assert_eq!(decide(&mut record, t, &p), Decision::RejectTooSoon);
        }
        // The fifth violation tripped the threshold.
        assert_eq!(record.blacklisted_until, Some(secs(0.5) + p.blacklist_duration));
        assert_eq!(record.violation_count, 0);
        assert!(record.is_blacklisted(secs(0.6)));
    }

    #[test]
    fn scenario_threshold_three() {
        // min_interval=1s, threshold=3: 0.0 Allow, then three violations,
        // blacklisted at 0.4, probed at 0.5.
        let p = params(3);
        let mut record = ClientRecord::default();

        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);
        assert_eq!(decide(&mut record, secs(0.2), &p), Decision::RejectTooSoon);
        assert_eq!(record.violation_count, 1);
        assert_eq!(decide(&mut record, secs(0.3), &p), Decision::RejectTooSoon);
        assert_eq!(record.violation_count, 2);
        assert_eq!(decide(&mut record, secs(0.4), &p), Decision::RejectTooSoon);
        assert_eq!(record.blacklisted_until, Some(secs(0.4) + p.blacklist_duration));

        assert_eq!(decide(&mut record, secs(0.5), &p), Decision::RejectBlacklisted);
    }

    #[test]
    fn probing_does_not_extend_the_blacklist() {
        let p = params(1);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);
        assert_eq!(decide(&mut record, secs(0.1), &p), Decision::RejectTooSoon);

        let until = record.blacklisted_until.expect("blacklisted");
        for i in 0..50 {
            let t = secs(0.2 + i as f64 * 0.05);
            assert_eq!(decide(&mut record, t, &p), Decision::RejectBlacklisted);
            assert_eq!(record.blacklisted_until, Some(until));
        }
    }

    #[test]
    fn blacklist_expiry_boundary() {
        let p = params(1);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);
        assert_eq!(decide(&mut record, secs(0.5), &p), Decision::RejectTooSoon);
        let until = secs(0.5) + p.blacklist_duration;
        assert_eq!(record.blacklisted_until, Some(until));

        // One tick before expiry: still rejected.
        assert_eq!(
            decide(&mut record, until - Duration::from_millis(1), &p),
            Decision::RejectBlacklisted
        );
        // At expiry: evaluated fresh, spacing long since satisfied.
        assert_eq!(decide(&mut record, until, &p), Decision::Allow);
        assert!(record.blacklisted_until.is_none());
        assert_eq!(record.violation_count, 0);
    }

    #[test]
    fn violations_decay_after_quiet_period() {
        let p = params(3);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);
        assert_eq!(decide(&mut record, secs(0.2), &p), Decision::RejectTooSoon);
        assert_eq!(decide(&mut record, secs(0.4), &p), Decision::RejectTooSoon);
        assert_eq!(record.violation_count, 2);

        // Quiet for longer than violation_decay, then well spaced.
        assert_eq!(decide(&mut record, secs(100.0), &p), Decision::Allow);
        assert_eq!(record.violation_count, 0);
        assert!(record.last_violation_at.is_none());
    }

    #[test]
    fn recent_violations_survive_an_allowed_request() {
        let p = params(3);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(0.0), &p), Decision::Allow);
        assert_eq!(decide(&mut record, secs(0.2), &p), Decision::RejectTooSoon);

        // Spacing satisfied but decay has not elapsed: the count sticks.
        assert_eq!(decide(&mut record, secs(2.0), &p), Decision::Allow);
        assert_eq!(record.violation_count, 1);
    }

    #[test]
    fn backwards_clock_reads_as_zero_gap() {
        let p = params(5);
        let mut record = ClientRecord::default();
        assert_eq!(decide(&mut record, secs(10.0), &p), Decision::Allow);

        // An arrival "before" the last accepted request clamps to a zero
        // interval and counts as a violation rather than panicking.
        assert_eq!(decide(&mut record, secs(5.0), &p), Decision::RejectTooSoon);
        assert_eq!(record.violation_count, 1);
    }

    #[test]
    fn idle_check_respects_threshold() {
        let record = ClientRecord {
            last_request_at: Some(secs(10.0)),
            ..Default::default()
        };
        assert!(!record.is_idle(secs(100.0), Duration::from_secs(300)));
        assert!(record.is_idle(secs(400.0), Duration::from_secs(300)));
    }

    #[test]
    fn params_validation_rejects_degenerate_values() {
        assert!(AdmissionParams::default().validate().is_ok());

        let mut p = AdmissionParams::default();
        p.violation_threshold = 0;
        assert!(p.validate().is_err());

        let mut p = AdmissionParams::default();
        p.blacklist_duration = Duration::ZERO;
        assert!(p.validate().is_err());

        let mut p = AdmissionParams::default();
        p.min_interval = Duration::ZERO;
        assert!(p.validate().is_err());
    }
}
