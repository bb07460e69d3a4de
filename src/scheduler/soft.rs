//! # Soft scheduler: deterministic, virtual time.
//!
//! [`SoftScheduler`] keeps submissions in a queue ordered by due time and runs them
//! synchronously on the caller's thread when told to. Time only moves through the
//! [`ManualClock`] it owns, so every run sees exactly the theoretical and actual times a
//! test expects.
//!
//! ## Ordering
//! Entries run by ascending due time; entries due at the same time run in submission
//! order (FIFO).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use ticktask::{Config, ManualClock, RepeatableTask, SoftScheduler, TaskContext, TaskError, TaskFn};
//!
//! let sched = Arc::new(SoftScheduler::new(Config::default(), Arc::new(ManualClock::new(0))));
//! let task = RepeatableTask::new(
//!     "tick",
//!     TaskFn::new(|cx: &mut TaskContext<'_>, t: i64, _a: i64| {
//!         if t < 30 {
//!             cx.set_next_theoretical_time_ns(t + 10);
//!         }
//!         Ok::<_, TaskError>(())
//!     }),
//!     sched.clone(),
//! );
//! task.start().unwrap();
//!
//! assert_eq!(sched.advance_to(100), 4); // t = 0, 10, 20, 30
//! assert!(task.is_done());
//! ```

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::Config;
use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::{RunnableRef, Scheduler};
use crate::time::{Clock, ManualClock};

/// Most recent run failures kept for [`SoftScheduler::take_failures`].
pub const FAILURE_LOG_CAPACITY: usize = 1024;

/// Queued submission.
struct Entry {
    due_ns: i64,
    seq: u64,
    task: RunnableRef,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due_ns, self.seq).cmp(&(other.due_ns, other.seq))
    }
}

/// Single-threaded cooperative scheduler over a [`ManualClock`].
pub struct SoftScheduler {
    clock: Arc<ManualClock>,
    bus: Bus,
    queue: Mutex<BinaryHeap<Reverse<Entry>>>,
    seq: AtomicU64,
    failures: Mutex<VecDeque<(String, RunError)>>,
}

impl SoftScheduler {
    /// Creates a scheduler driving `clock`.
    pub fn new(cfg: Config, clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            bus: Bus::new(cfg.bus_capacity_clamped()),
            queue: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// The clock this scheduler advances.
    pub fn manual_clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Number of queued submissions.
    pub fn pending(&self) -> usize {
        self.lock_queue().len()
    }

    /// Due time of the earliest queued submission.
    pub fn next_due_ns(&self) -> Option<i64> {
        self.lock_queue().peek().map(|Reverse(e)| e.due_ns)
    }

    /// Runs every submission due at or before the current time, including submissions made
    /// during this call that are already due. Returns the number of runs.
    pub fn run_due(&self) -> usize {
        let now = self.clock.time_ns();
        let mut runs = 0;
        while let Some(entry) = self.pop_due(now) {
            self.run_entry(entry);
            runs += 1;
        }
        runs
    }

    /// Runs submissions in due order up to `time_ns`, moving the clock to each due time
    /// before its run, then leaves the clock at `time_ns`. Returns the number of runs.
    ///
    /// The clock never moves backwards: overdue entries run at the current time.
    pub fn advance_to(&self, time_ns: i64) -> usize {
        let mut runs = 0;
        while let Some(entry) = self.pop_due(time_ns) {
            self.clock.advance_to_ns(entry.due_ns);
            self.run_entry(entry);
            runs += 1;
        }
        self.clock.advance_to_ns(time_ns);
        runs
    }

    /// Shorthand for `advance_to(now + delta_ns)`.
    pub fn advance_by(&self, delta_ns: i64) -> usize {
        let target = self.clock.time_ns().saturating_add(delta_ns.max(0));
        self.advance_to(target)
    }

    /// Runs submissions in due order, jumping the clock forward, until the queue is empty
    /// or `max_runs` runs happened. Returns the number of runs.
    pub fn run_until_idle(&self, max_runs: usize) -> usize {
        let mut runs = 0;
        while runs < max_runs {
            let Some(entry) = self.pop_due(i64::MAX) else {
                break;
            };
            self.clock.advance_to_ns(entry.due_ns);
            self.run_entry(entry);
            runs += 1;
        }
        runs
    }

    /// Drops every queued submission, cancelling each runnable. Returns how many were dropped.
    pub fn cancel_pending(&self) -> usize {
        let drained: Vec<Entry> = {
            let mut queue = self.lock_queue();
            std::mem::take(&mut *queue)
                .into_sorted_vec()
                .into_iter()
                .rev()
                .map(|Reverse(e)| e)
                .collect()
        };
        let count = drained.len();
        for entry in drained {
            if let Err(e) = entry.task.cancel() {
                self.record_failure(entry.task.name(), e);
            }
        }
        count
    }

    /// Takes the errors that escaped `run()`/`cancel()` so far, with the task name.
    ///
    /// At most [`FAILURE_LOG_CAPACITY`] failures are kept; older ones are dropped (they were
    /// still published as `RunFailed`).
    pub fn take_failures(&self) -> Vec<(String, RunError)> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner)).into()
    }

    fn pop_due(&self, limit_ns: i64) -> Option<Entry> {
        let mut queue = self.lock_queue();
        match queue.peek() {
            Some(Reverse(e)) if e.due_ns <= limit_ns => queue.pop().map(|Reverse(e)| e),
            _ => None,
        }
    }

    fn run_entry(&self, entry: Entry) {
        let task = entry.task;
        let name = task.name().to_string();
        if let Err(e) = task.run() {
            self.record_failure(&name, e);
        }
    }

    fn record_failure(&self, name: &str, err: RunError) {
        self.bus.publish(
            Event::new(EventKind::RunFailed)
                .with_task(name)
                .with_reason(err.to_string()),
        );
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if failures.len() == FAILURE_LOG_CAPACITY {
            failures.pop_front();
        }
        failures.push_back((name.to_string(), err));
    }

    fn lock_queue(&self) -> MutexGuard<'_, BinaryHeap<Reverse<Entry>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for SoftScheduler {
    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn bus(&self) -> &Bus {
        &self.bus
    }

    fn execute_at_ns(&self, task: RunnableRef, time_ns: i64) {
        let seq = self.seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.lock_queue().push(Reverse(Entry {
            due_ns: time_ns,
            seq,
            task,
        }));
    }
}
