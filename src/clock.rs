//! Monotonic time sources for the admission engine.
//!
//! Timestamps are offsets from the clock's origin, so decisions never depend
//! on wall-clock time and tests can drive the engine with a hand-advanced
//! clock instead of sleeping.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

/// A point in time, measured from the owning clock's origin.
pub type Timestamp = Duration;

#[derive(Debug, Clone, Error)]
#[error("clock read failed: {0}")]
pub struct ClockError(pub String);

/// Injectable time source.
///
/// `now` is fallible so a broken time source aborts a decision before any
/// client record is touched.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<Timestamp, ClockError>;
}

/// Production clock backed by `Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        Ok(self.origin.elapsed())
    }
}

/// Hand-advanced clock for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the clock at `now` instead of zero.
    pub fn starting_at(now: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        let now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        Ok(*now)
    }
}
