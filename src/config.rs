//! # Scheduler configuration.
//!
//! Provides [`Config`] centralized settings shared by both scheduler flavors.
//!
//! Config is used in two ways:
//! 1. **Soft scheduling**: `SoftScheduler::new(config, clock)` (bus only)
//! 2. **Hard scheduling**: `HardScheduler::new(config)` (bus, grace, concurrency, time speed)
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no global semaphore created)
//! - `grace = 0s` → shutdown does not wait for in-flight runs

use std::time::Duration;

/// Global configuration for schedulers.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: Maximum wait for in-flight runs on hard scheduler shutdown
/// - `max_concurrent`: Limit of simultaneously executing runs (`0` = unlimited)
/// - `time_speed`: Ratio of theoretical time flow to real time flow for the system clock
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Maximum time to wait for in-flight runs when the hard scheduler shuts down.
    ///
    /// If exceeded, shutdown returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Maximum number of runs executing concurrently on the hard scheduler.
    ///
    /// - `0` = unlimited (no semaphore)
    /// - `n > 0` = at most `n` runs execute simultaneously
    pub max_concurrent: usize,

    /// Time dilation of the hard scheduler's clock.
    ///
    /// `2.0` makes theoretical time flow twice as fast as wall time.
    pub time_speed: f64,
}

impl Config {
    /// Returns the global concurrency limit as an `Option`.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the time speed, falling back to `1.0` for non-finite or non-positive values.
    #[inline]
    pub fn time_speed_clamped(&self) -> f64 {
        if self.time_speed.is_finite() && self.time_speed > 0.0 {
            self.time_speed
        } else {
            1.0
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `grace = 60s`
    /// - `max_concurrent = 0` (unlimited)
    /// - `time_speed = 1.0` (real time)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            grace: Duration::from_secs(60),
            max_concurrent: 0,
            time_speed: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let mut cfg = Config::default();
        assert_eq!(cfg.concurrency_limit(), None);
        cfg.max_concurrent = 3;
        assert_eq!(cfg.concurrency_limit(), Some(3));

        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_time_speed_clamped() {
        let mut cfg = Config::default();
        assert_eq!(cfg.time_speed_clamped(), 1.0);
        cfg.time_speed = 4.0;
        assert_eq!(cfg.time_speed_clamped(), 4.0);
        cfg.time_speed = 0.0;
        assert_eq!(cfg.time_speed_clamped(), 1.0);
        cfg.time_speed = f64::NAN;
        assert_eq!(cfg.time_speed_clamped(), 1.0);
    }
}
