//! # Function-backed task logic (`TaskFn`)
//!
//! [`TaskFn`] wraps a closure `F: FnMut(&mut TaskContext, i64, i64) -> Result<(), TaskError>`
//! used as the body; `on_begin`/`on_end`/`on_done` keep their no-op defaults.
//!
//! ## Example
//! ```rust
//! use ticktask::{RepeatableRunnable, Step, TaskContext, TaskError, TaskFn};
//!
//! let mut left = 2;
//! let task = RepeatableRunnable::new(
//!     "countdown",
//!     TaskFn::new(move |cx: &mut TaskContext<'_>, theoretical_ns: i64, _actual_ns: i64| {
//!         left -= 1;
//!         if left > 0 {
//!             cx.set_next_theoretical_time_ns(theoretical_ns + 100);
//!         }
//!         Ok::<_, TaskError>(())
//!     }),
//! );
//!
//! assert_eq!(task.run_at(0, 0).unwrap(), Step::Repeat { at_ns: 100 });
//! assert_eq!(task.run_at(100, 100).unwrap(), Step::Done);
//! ```

use crate::error::TaskError;
use crate::tasks::context::TaskContext;
use crate::tasks::logic::TaskLogic;

/// Closure-backed body.
#[derive(Debug)]
pub struct TaskFn<F> {
    f: F,
}

impl<F> TaskFn<F>
where
    F: FnMut(&mut TaskContext<'_>, i64, i64) -> Result<(), TaskError> + Send + 'static,
{
    /// Wraps `f` as the task body.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> TaskLogic for TaskFn<F>
where
    F: FnMut(&mut TaskContext<'_>, i64, i64) -> Result<(), TaskError> + Send + 'static,
{
    fn run(
        &mut self,
        cx: &mut TaskContext<'_>,
        theoretical_ns: i64,
        actual_ns: i64,
    ) -> Result<(), TaskError> {
        (self.f)(cx, theoretical_ns, actual_ns)
    }
}
