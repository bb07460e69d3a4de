//! # Hard clock.
//!
//! [`SystemClock`] measures theoretical time as the real time elapsed since an explicitly
//! captured epoch, scaled by a time speed.

use std::time::{Duration, Instant};

use super::clock::Clock;

/// Real-time clock with optional time dilation.
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
    speed: f64,
}

impl SystemClock {
    /// Creates a clock reading `0` now, flowing at real speed.
    pub fn new() -> Self {
        Self::with_epoch(Instant::now(), 1.0)
    }

    /// Creates a clock reading `0` at `epoch`, flowing `speed` times faster than real time.
    ///
    /// Non-finite or non-positive speeds fall back to `1.0`.
    pub fn with_epoch(epoch: Instant, speed: f64) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        Self { epoch, speed }
    }

    /// Returns the epoch this clock measures from.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Converts a theoretical delay into the wall time it takes at this clock's speed.
    ///
    /// Negative delays map to zero.
    pub fn real_delay(&self, theoretical_delay_ns: i64) -> Duration {
        if theoretical_delay_ns <= 0 {
            return Duration::ZERO;
        }
        if self.speed == 1.0 {
            return Duration::from_nanos(theoretical_delay_ns as u64);
        }
        Duration::from_nanos((theoretical_delay_ns as f64 / self.speed) as u64)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn time_ns(&self) -> i64 {
        let elapsed = self.epoch.elapsed().as_nanos();
        if self.speed == 1.0 {
            return elapsed.min(i64::MAX as u128) as i64;
        }
        (elapsed as f64 * self.speed) as i64
    }

    fn time_speed(&self) -> f64 {
        self.speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic() {
        let clock = SystemClock::new();
        let a = clock.time_ns();
        let b = clock.time_ns();
        assert!(a >= 0);
        assert!(b >= a);
    }

    #[test]
    fn test_speed_scales_time() {
        let epoch = Instant::now() - Duration::from_millis(100);
        let clock = SystemClock::with_epoch(epoch, 10.0);
        assert!(clock.time_ns() >= 1_000_000_000);
        assert_eq!(clock.time_speed(), 10.0);
    }

    #[test]
    fn test_real_delay() {
        let clock = SystemClock::with_epoch(Instant::now(), 2.0);
        assert_eq!(clock.real_delay(2_000), Duration::from_nanos(1_000));
        assert_eq!(clock.real_delay(-5), Duration::ZERO);

        let invalid = SystemClock::with_epoch(Instant::now(), -3.0);
        assert_eq!(invalid.time_speed(), 1.0);
        assert_eq!(invalid.real_delay(7), Duration::from_nanos(7));
    }
}
