//! # Clock contract and unit conversions.

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Supplies the current theoretical time.
///
/// A clock is a pure query interface: it never mutates anything observable by its callers
/// and may be shared freely across threads.
pub trait Clock: Send + Sync {
    /// Current theoretical time in nanoseconds.
    fn time_ns(&self) -> i64;

    /// Current theoretical time in seconds.
    fn time_seconds(&self) -> f64 {
        ns_to_seconds(self.time_ns())
    }

    /// Ratio of theoretical time flow to real time flow.
    fn time_speed(&self) -> f64 {
        1.0
    }
}

/// Converts nanoseconds to seconds.
#[inline]
pub fn ns_to_seconds(ns: i64) -> f64 {
    ns as f64 / NANOS_PER_SECOND as f64
}

/// Converts seconds to nanoseconds, rounding to the nearest nanosecond.
///
/// Out-of-range values saturate; `NaN` maps to `0`.
#[inline]
pub fn seconds_to_ns(seconds: f64) -> i64 {
    // `as` saturates for floats and maps NaN to zero.
    (seconds * NANOS_PER_SECOND as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(i64);

    impl Clock for Fixed {
        fn time_ns(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_default_seconds_view() {
        let clock = Fixed(1_500_000_000);
        assert_eq!(clock.time_seconds(), 1.5);
        assert_eq!(clock.time_speed(), 1.0);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(seconds_to_ns(0.25), 250_000_000);
        assert_eq!(seconds_to_ns(-1.0), -NANOS_PER_SECOND);
        assert_eq!(seconds_to_ns(1e-9), 1);
        assert_eq!(seconds_to_ns(f64::NAN), 0);
        assert_eq!(seconds_to_ns(f64::INFINITY), i64::MAX);
        assert_eq!(ns_to_seconds(2 * NANOS_PER_SECOND), 2.0);
    }
}
