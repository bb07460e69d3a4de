//! # Lifecycle events emitted by tasks, processes and schedulers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Task lifecycle**: begin, repeating, ending, done, cancelled
//! - **Failures**: hook failed, hook suppressed, run failed
//! - **Process lifecycle**: started, stop requested, ended
//! - **Runtime**: shutdown and subscriber delivery problems
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use ticktask::{Event, EventKind, Hook};
//!
//! let ev = Event::new(EventKind::HookFailed)
//!     .with_task("poller")
//!     .with_hook(Hook::Run)
//!     .with_reason("boom")
//!     .with_times(1_000, 1_004);
//!
//! assert_eq!(ev.kind, EventKind::HookFailed);
//! assert_eq!(ev.task.as_deref(), Some("poller"));
//! assert_eq!(ev.actual_ns, Some(1_004));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::Hook;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Task lifecycle ===
    /// First run of a task is about to call `on_begin`.
    ///
    /// Sets: `task`, `theoretical_ns`, `actual_ns`
    TaskBegin,

    /// A run finished and requested another one.
    ///
    /// Sets: `task`, `theoretical_ns`, `actual_ns`, `next_ns`
    TaskRepeating,

    /// Termination sequence started (`on_end` is about to be called).
    ///
    /// Sets: `task`
    TaskEnding,

    /// Termination sequence finished; the task will never run again.
    ///
    /// Sets: `task`
    TaskDone,

    /// The task terminated because cancellation was requested.
    ///
    /// Published right before `TaskDone`. Sets: `task`
    TaskCancelled,

    // === Failures ===
    /// A hook failed; this failure is the one propagated to the caller.
    ///
    /// Sets: `task`, `hook`, `reason`
    HookFailed,

    /// A hook failed after an earlier failure in the same termination sequence.
    ///
    /// Sets: `task`, `hook`, `reason`
    HookSuppressed,

    /// A scheduler observed an error escaping `run()`.
    ///
    /// Sets: `task`, `reason`
    RunFailed,

    // === Process lifecycle ===
    /// `Process::start` submitted a new cycle.
    ///
    /// Sets: `task`
    ProcessStarted,

    /// `Process::stop` (or a stop from inside a hook) was requested.
    ///
    /// Sets: `task`
    ProcessStopRequested,

    /// The process cycle finished winding down (`alive` became false).
    ///
    /// Sets: `task`
    ProcessEnded,

    // === Runtime ===
    /// Hard scheduler shutdown requested.
    ShutdownRequested,

    /// All in-flight runs finished within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some runs were still in flight.
    GraceExceeded,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason`
    SubscriberPanicked,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task, process or subscriber, if applicable.
    pub task: Option<Arc<str>>,
    /// Hook involved, for failure events.
    pub hook: Option<Hook>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Theoretical time of the run, in nanoseconds.
    pub theoretical_ns: Option<i64>,
    /// Actual time of the run, in nanoseconds.
    pub actual_ns: Option<i64>,
    /// Requested next theoretical time, in nanoseconds.
    pub next_ns: Option<i64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            hook: None,
            reason: None,
            theoretical_ns: None,
            actual_ns: None,
            next_ns: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches the hook involved.
    #[inline]
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Attaches theoretical and actual run times.
    #[inline]
    pub fn with_times(mut self, theoretical_ns: i64, actual_ns: i64) -> Self {
        self.theoretical_ns = Some(theoretical_ns);
        self.actual_ns = Some(actual_ns);
        self
    }

    /// Attaches the requested next theoretical time.
    #[inline]
    pub fn with_next(mut self, next_ns: i64) -> Self {
        self.next_ns = Some(next_ns);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::HookFailed | EventKind::HookSuppressed | EventKind::RunFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::TaskBegin);
        let b = Event::new(EventKind::TaskDone);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_failure_classification() {
        assert!(Event::new(EventKind::HookSuppressed).is_failure());
        assert!(!Event::new(EventKind::TaskCancelled).is_failure());
        let ev = Event::subscriber_overflow("audit", "full");
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
    }
}
