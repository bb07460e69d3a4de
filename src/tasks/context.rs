//! # Per-execution scheduling record handed to hooks.
//!
//! A [`TaskContext`] exists only while its hook executes. It carries the theoretical and
//! actual time of the current run and the "next theoretical time" slot a hook uses to
//! request repetition.
//!
//! ## Rules
//! - The slot is cleared when a run starts; if it is still empty once the body returns,
//!   the task terminates.
//! - Writes to the slot from `on_end`/`on_done` are ignored.
//! - `cancel()` from `on_begin`/`run` suppresses any repetition requested in the same run;
//!   from `on_end`/`on_done` it has no effect.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::Hook;
use crate::tasks::state::Cell;

/// Scheduling record of the hook currently executing.
pub struct TaskContext<'a> {
    cell: &'a Mutex<Cell>,
    hook: Hook,
    theoretical_ns: i64,
    actual_ns: i64,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(cell: &'a Mutex<Cell>, hook: Hook, theoretical_ns: i64, actual_ns: i64) -> Self {
        Self {
            cell,
            hook,
            theoretical_ns,
            actual_ns,
        }
    }

    fn lock(&self) -> MutexGuard<'a, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn may_request(&self) -> bool {
        matches!(self.hook, Hook::OnBegin | Hook::Run)
    }

    /// Hook currently executing.
    pub fn hook(&self) -> Hook {
        self.hook
    }

    /// Time this run was due.
    pub fn theoretical_time_ns(&self) -> i64 {
        self.theoretical_ns
    }

    /// Time this run actually started.
    pub fn actual_time_ns(&self) -> i64 {
        self.actual_ns
    }

    /// Requests another run at theoretical time `time_ns`.
    pub fn set_next_theoretical_time_ns(&mut self, time_ns: i64) {
        if self.may_request() {
            self.lock().next_ns = Some(time_ns);
        }
    }

    /// Withdraws a previously requested next run.
    pub fn clear_theoretical_time(&mut self) {
        if self.may_request() {
            self.lock().next_ns = None;
        }
    }

    /// Next theoretical time requested so far in this run.
    pub fn next_theoretical_time_ns(&self) -> Option<i64> {
        self.lock().next_ns
    }

    /// True if a next run is currently requested.
    pub fn is_theoretical_time_set(&self) -> bool {
        self.next_theoretical_time_ns().is_some()
    }

    /// Requests cancellation. Observed as soon as the current hook returns.
    pub fn cancel(&mut self) {
        if self.may_request() {
            self.lock().cancel_requested = true;
        }
    }

    /// True if cancellation has been requested.
    pub fn is_cancellation_requested(&self) -> bool {
        self.lock().cancel_requested
    }
}
