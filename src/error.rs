//! Error types used by the scheduling core, its hooks and the hard scheduler.
//!
//! This module defines the error enums:
//!
//! - [`TaskError`]: errors returned by user hooks (`on_begin`, `run`, `on_end`, `on_done`).
//! - [`RunError`]: what a caller of `run()`/`cancel()` observes after the termination sequence.
//! - [`ContractViolation`]: misuse of a task by a scheduler or caller (never recoverable).
//! - [`RuntimeError`]: errors raised by the hard scheduler itself.
//!
//! Errors provide helper methods (`as_label`, `as_message`) for logs and events.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::tasks::Status;

/// # Errors produced by the hard scheduler runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some runs were still in flight.
    #[error("shutdown timeout {grace:?} exceeded; stuck runs: {stuck}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Number of runs that did not finish in time.
        stuck: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use ticktask::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: 0 };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck runs={stuck}")
            }
        }
    }
}

/// # Errors returned by task and process hooks.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// Hook failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Hook panicked; the panic was contained and converted.
    #[error("hook panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl TaskError {
    /// Shorthand for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use ticktask::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Builds a [`TaskError::Panicked`] from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        TaskError::Panicked {
            info: panic_message(payload.as_ref()),
        }
    }
}

/// Renders a `catch_unwind` payload (`&str`/`String` panics, otherwise a placeholder).
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Lifecycle hook of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Setup, called once before the first body run.
    OnBegin,
    /// The repeated body.
    Run,
    /// Teardown, called once when the task terminates.
    OnEnd,
    /// Final bookkeeping, called once right after `on_end`.
    OnDone,
}

impl Hook {
    /// Stable snake_case name of the hook.
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::OnBegin => "on_begin",
            Hook::Run => "run",
            Hook::OnEnd => "on_end",
            Hook::OnDone => "on_done",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook error together with the hook that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{hook} failed: {error}")]
pub struct HookFailure {
    /// Hook that failed.
    pub hook: Hook,
    /// The error it returned (or the converted panic).
    #[source]
    pub error: TaskError,
}

impl HookFailure {
    pub(crate) fn new(hook: Hook, error: TaskError) -> Self {
        Self { hook, error }
    }
}

/// # Misuse of a task by its driver.
///
/// These always indicate a scheduler or caller bug.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// `run()` was entered while a hook of the same instance was still executing.
    #[error("task {task:?} re-entered while {status:?}")]
    Reentrant {
        /// Task name.
        task: String,
        /// Status observed at entry.
        status: Status,
    },

    /// A scheduler-bound task outlived the scheduler it resubmits itself to.
    #[error("scheduler of task {task:?} is gone")]
    SchedulerGone {
        /// Task name.
        task: String,
    },
}

/// # Outcome of a failed `run()` or `cancel()`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A hook failed. The termination sequence has completed and the task is done.
    ///
    /// `first` is the earliest failure in hook order; later failures from the same
    /// termination sequence are kept in `suppressed`.
    #[error("{first} (suppressed: {})", .suppressed.len())]
    Hook {
        /// Earliest failure.
        first: HookFailure,
        /// Failures of later hooks in the same sequence.
        suppressed: Vec<HookFailure>,
    },

    /// The task was driven in a way its contract forbids.
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Hook { .. } => "run_hook_failed",
            RunError::Contract(_) => "run_contract_violation",
        }
    }

    /// Returns the hook whose failure is propagated, if any.
    pub fn hook(&self) -> Option<Hook> {
        match self {
            RunError::Hook { first, .. } => Some(first.hook),
            RunError::Contract(_) => None,
        }
    }

    /// Returns the propagated hook error, if any.
    pub fn task_error(&self) -> Option<&TaskError> {
        match self {
            RunError::Hook { first, .. } => Some(&first.error),
            RunError::Contract(_) => None,
        }
    }

    /// Returns the failures that were attached as suppressed.
    pub fn suppressed(&self) -> &[HookFailure] {
        match self {
            RunError::Hook { suppressed, .. } => suppressed,
            RunError::Contract(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payload_is_rendered() {
        let err = TaskError::from_panic(Box::new("boom"));
        assert_eq!(err, TaskError::Panicked { info: "boom".into() });

        let err = TaskError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.as_message(), "panic: owned");

        let err = TaskError::from_panic(Box::new(42u8));
        assert_eq!(err.as_label(), "task_panicked");
    }

    #[test]
    fn test_labels_and_messages() {
        let err = TaskError::fail("disk full");
        assert_eq!(err.as_label(), "task_failed");
        assert_eq!(err.as_message(), "error: disk full");
        assert_eq!(err.to_string(), "execution failed: disk full");

        let err = TaskError::Panicked { info: "boom".into() };
        assert_eq!(err.as_label(), "task_panicked");
        assert_eq!(err.to_string(), "hook panicked: boom");
    }

    #[test]
    fn test_run_error_exposes_first_and_suppressed() {
        let err = RunError::Hook {
            first: HookFailure::new(Hook::Run, TaskError::fail("body")),
            suppressed: vec![HookFailure::new(Hook::OnDone, TaskError::fail("done"))],
        };
        assert_eq!(err.hook(), Some(Hook::Run));
        assert_eq!(err.task_error(), Some(&TaskError::fail("body")));
        assert_eq!(err.suppressed().len(), 1);
        assert_eq!(
            err.to_string(),
            "run failed: execution failed: body (suppressed: 1)"
        );
    }
}
