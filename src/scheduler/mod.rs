//! # Scheduler contract and implementations.
//!
//! A [`Scheduler`] runs [`Runnable`]s "now", "after a delay" or "at an absolute time",
//! in nanoseconds or seconds, against the [`Clock`] it exposes.
//!
//! ## Contents
//! - [`Runnable`] unit of work a scheduler drives; [`RunnableRef`] shared handle
//! - [`Scheduler`] submission contract (only `execute_at_ns` is required)
//! - [`SoftScheduler`] single-threaded, deterministic, virtual time
//! - [`HardScheduler`] tokio-backed, real threads and [`SystemClock`](crate::SystemClock)
//!
//! ## Rules
//! - Submission never runs the task inside the submitting call, so a task may resubmit
//!   itself from inside `run()`.
//! - A runnable resubmits itself only after its run returned; this keeps successive runs
//!   of one instance strictly ordered on both schedulers.
//! - Errors escaping `run()` are published as `RunFailed` events; they never stop the
//!   scheduler.

mod hard;
mod soft;

pub use hard::HardScheduler;
pub use soft::{FAILURE_LOG_CAPACITY, SoftScheduler};

use std::sync::Arc;

use crate::error::RunError;
use crate::events::Bus;
use crate::time::{Clock, seconds_to_ns};

/// Unit of work driven by a scheduler.
pub trait Runnable: Send + Sync + 'static {
    /// Stable, human-readable name.
    fn name(&self) -> &str;

    /// Executes one due run.
    fn run(self: Arc<Self>) -> Result<(), RunError>;

    /// Called by a scheduler that drops a pending submission (shutdown).
    fn cancel(&self) -> Result<(), RunError> {
        Ok(())
    }
}

/// Shared reference to a runnable.
pub type RunnableRef = Arc<dyn Runnable>;

/// Submission contract shared by soft and hard scheduling.
pub trait Scheduler: Send + Sync + 'static {
    /// Clock this scheduler measures due times against.
    fn clock(&self) -> &dyn Clock;

    /// Bus lifecycle events are published to.
    fn bus(&self) -> &Bus;

    /// Runs `task` at theoretical time `time_ns` (immediately if already past).
    fn execute_at_ns(&self, task: RunnableRef, time_ns: i64);

    /// Runs `task` as soon as possible.
    fn execute(&self, task: RunnableRef) {
        let now = self.clock().time_ns();
        self.execute_at_ns(task, now);
    }

    /// Runs `task` `delay_ns` after the current time.
    fn execute_after_ns(&self, task: RunnableRef, delay_ns: i64) {
        let at = self.clock().time_ns().saturating_add(delay_ns);
        self.execute_at_ns(task, at);
    }

    /// Runs `task` at theoretical time `time_s` seconds.
    fn execute_at_seconds(&self, task: RunnableRef, time_s: f64) {
        self.execute_at_ns(task, seconds_to_ns(time_s));
    }

    /// Runs `task` `delay_s` seconds after the current time.
    fn execute_after_seconds(&self, task: RunnableRef, delay_s: f64) {
        self.execute_after_ns(task, seconds_to_ns(delay_s));
    }
}
