//! # Task logic: the hooks a task runs.
//!
//! [`TaskLogic`] is implemented by user code and driven by
//! [`RepeatableRunnable`](crate::RepeatableRunnable). Only [`TaskLogic::run`] is required.
//!
//! ## Example
//! ```
//! use ticktask::{TaskContext, TaskError, TaskLogic};
//!
//! struct Poll { left: u32 }
//!
//! impl TaskLogic for Poll {
//!     fn run(&mut self, cx: &mut TaskContext<'_>, theoretical_ns: i64, _actual_ns: i64) -> Result<(), TaskError> {
//!         self.left -= 1;
//!         if self.left > 0 {
//!             cx.set_next_theoretical_time_ns(theoretical_ns + 1_000_000);
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::TaskError;
use crate::scheduler::{RunnableRef, Scheduler};
use crate::tasks::context::TaskContext;

/// Hooks of a schedulable unit of work.
///
/// Hooks of one instance never run concurrently or recursively.
pub trait TaskLogic: Send + 'static {
    /// Setup, called once before the first body run. May cancel or request a next time.
    fn on_begin(&mut self, _cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        Ok(())
    }

    /// The repeated body. Requests repetition through `cx`.
    fn run(
        &mut self,
        cx: &mut TaskContext<'_>,
        theoretical_ns: i64,
        actual_ns: i64,
    ) -> Result<(), TaskError>;

    /// Teardown, called exactly once however the task terminates.
    fn on_end(&mut self, _cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        Ok(())
    }

    /// Final bookkeeping, called exactly once right after `on_end`, even if it failed.
    fn on_done(&mut self, _cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        Ok(())
    }

    /// Resubmits a scheduler-bound task that requested a run at `time_ns`.
    ///
    /// Override to redirect, e.g. `scheduler.execute(task)` to run again as soon as possible.
    fn reschedule_at_ns(&self, scheduler: &dyn Scheduler, task: RunnableRef, time_ns: i64) {
        scheduler.execute_at_ns(task, time_ns);
    }
}
