//! Theoretical time sources.
//!
//! ## Contents
//! - [`Clock`] read-only time query contract shared by schedulers and tasks
//! - [`ManualClock`] soft clock advanced programmatically (deterministic tests)
//! - [`SystemClock`] hard clock backed by a monotonic [`Instant`](std::time::Instant)
//!
//! Time is expressed as signed nanoseconds (`i64`) with a seconds (`f64`) view.

mod clock;
mod manual;
mod system;

pub use clock::{Clock, NANOS_PER_SECOND, ns_to_seconds, seconds_to_ns};
pub use manual::ManualClock;
pub use system::SystemClock;
