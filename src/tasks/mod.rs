//! # Task state machine and scheduler binding.
//!
//! This module provides the core task-related types:
//! - [`Status`], [`Step`] lifecycle status and per-run outcome
//! - [`TaskContext`] scheduling record handed to hooks
//! - [`TaskLogic`] hooks implemented by user code
//! - [`RepeatableRunnable`] scheduler-agnostic state machine
//! - [`RepeatableTask`] state machine bound to a [`Scheduler`](crate::Scheduler)
//! - [`TaskFn`] closure-backed body-only logic

mod context;
mod logic;
mod repeatable;
mod runnable;
mod state;
mod task_fn;

pub use context::TaskContext;
pub use logic::TaskLogic;
pub use repeatable::RepeatableTask;
pub use runnable::RepeatableRunnable;
pub use state::{Status, Step};
pub use task_fn::TaskFn;

#[cfg(test)]
pub(crate) use runnable::tests::Probe;
