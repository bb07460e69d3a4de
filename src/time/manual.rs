//! # Soft clock.
//!
//! [`ManualClock`] only moves when told to. It backs the soft scheduler and makes
//! lifecycle tests fully deterministic: every test builds its own instance, there is no
//! shared epoch.

use std::sync::atomic::{AtomicI64, Ordering};

use super::clock::{Clock, seconds_to_ns};

/// Clock advanced programmatically.
#[derive(Debug)]
pub struct ManualClock {
    now_ns: AtomicI64,
    speed: f64,
}

impl ManualClock {
    /// Creates a clock reading `start_ns`.
    pub fn new(start_ns: i64) -> Self {
        Self {
            now_ns: AtomicI64::new(start_ns),
            speed: 1.0,
        }
    }

    /// Reports `speed` from [`Clock::time_speed`].
    ///
    /// A soft clock does not flow on its own; the value describes the simulation to
    /// collaborators that scale real durations.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Sets the current time, possibly backwards.
    pub fn set_ns(&self, time_ns: i64) {
        self.now_ns.store(time_ns, Ordering::Release);
    }

    /// Moves time forward by `delta_ns` (negative deltas are ignored). Returns the new time.
    pub fn advance_ns(&self, delta_ns: i64) -> i64 {
        let delta = delta_ns.max(0);
        self.now_ns.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Moves time forward by `delta` seconds. Returns the new time in nanoseconds.
    pub fn advance_seconds(&self, delta: f64) -> i64 {
        self.advance_ns(seconds_to_ns(delta))
    }

    /// Moves time to `time_ns` unless that would go backwards. Returns the new time.
    pub fn advance_to_ns(&self, time_ns: i64) -> i64 {
        let prev = self.now_ns.fetch_max(time_ns, Ordering::AcqRel);
        prev.max(time_ns)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for ManualClock {
    fn time_ns(&self) -> i64 {
        self.now_ns.load(Ordering::Acquire)
    }

    fn time_speed(&self) -> f64 {
        self.speed
    }
}
