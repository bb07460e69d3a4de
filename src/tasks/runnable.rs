//! # Repeatable runnable: the task state machine.
//!
//! [`RepeatableRunnable`] drives a [`TaskLogic`] through its lifecycle. It knows nothing
//! about schedulers: the driver passes the theoretical and actual time of each run and
//! decides what to do with the returned [`Step`].
//!
//! ## Flow of one `run_at`
//! ```text
//! run_at(theoretical, actual)
//!   ├─ Pending   → on_begin ──fail──────────────► terminate, rethrow
//!   │                 └─cancelled──────────────► terminate
//!   ├─ Repeating ─┐
//!   │             ▼
//!   │           run ──fail─────────────────────► terminate, rethrow
//!   │             ├─ cancelled ────────────────► terminate          (cancel wins)
//!   │             ├─ next time set ────────────► Repeating, Step::Repeat
//!   │             └─ no next time ─────────────► terminate
//!   └─ Done      → Step::Done (stale submission)
//!
//! terminate: on_end → on_done → Done   (both always attempted)
//! ```
//!
//! ## Rules
//! - `on_begin`, `on_end` and `on_done` run exactly once per instance.
//! - The first hook failure wins; later failures of the same sequence are attached as
//!   suppressed and published as `HookSuppressed`.
//! - Panics in hooks are contained and treated as failures.
//! - The status always ends at `Done` once termination started.
//! - `run_at` is single-flight: entering it while a hook executes is a contract violation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ContractViolation, Hook, HookFailure, RunError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::context::TaskContext;
use crate::tasks::logic::TaskLogic;
use crate::tasks::state::{Cell, Status, Step};

/// State machine for a single schedulable unit of work.
pub struct RepeatableRunnable<L> {
    name: Arc<str>,
    cell: Mutex<Cell>,
    logic: Mutex<L>,
    bus: Option<Bus>,
}

impl<L: TaskLogic> RepeatableRunnable<L> {
    /// Creates a pending runnable.
    pub fn new(name: impl Into<Arc<str>>, logic: L) -> Self {
        Self {
            name: name.into(),
            cell: Mutex::new(Cell::new()),
            logic: Mutex::new(logic),
            bus: None,
        }
    }

    /// Publishes lifecycle events to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes the state machine once.
    ///
    /// ### Errors
    /// - [`RunError::Hook`] if a hook failed; the task is `Done` when this is returned.
    /// - [`RunError::Contract`] if a hook of this instance is currently executing.
    pub fn run_at(&self, theoretical_ns: i64, actual_ns: i64) -> Result<Step, RunError> {
        let first = {
            let mut cell = self.lock_cell();
            match cell.status {
                Status::Pending => cell.status = Status::OnBegin,
                Status::Repeating => cell.status = Status::Running,
                Status::Done => return Ok(Step::Done),
                // Cancellation from another thread is terminating the task.
                Status::OnEnd | Status::OnDone if cell.cancel_requested => return Ok(Step::Done),
                status => {
                    return Err(ContractViolation::Reentrant {
                        task: self.name.to_string(),
                        status,
                    }
                    .into());
                }
            }
            cell.next_ns = None;
            cell.theoretical_ns = theoretical_ns;
            cell.actual_ns = actual_ns;
            cell.status == Status::OnBegin
        };

        let mut logic = self.lock_logic();

        if first {
            self.publish(
                Event::new(EventKind::TaskBegin)
                    .with_task(self.name.clone())
                    .with_times(theoretical_ns, actual_ns),
            );
            if let Err(e) = self.call(Hook::OnBegin, &mut logic, |l, cx| l.on_begin(cx)) {
                self.lock_cell().claim_termination();
                return self
                    .finish(&mut logic, Some(HookFailure::new(Hook::OnBegin, e)))
                    .map(|()| Step::Done);
            }

            let mut cell = self.lock_cell();
            if cell.cancel_requested {
                cell.claim_termination();
                drop(cell);
                return self.finish(&mut logic, None).map(|()| Step::Done);
            }
            cell.status = Status::Running;
        }

        let body = self.call(Hook::Run, &mut logic, |l, cx| {
            let (theoretical, actual) = (cx.theoretical_time_ns(), cx.actual_time_ns());
            l.run(cx, theoretical, actual)
        });
        if let Err(e) = body {
            self.lock_cell().claim_termination();
            return self
                .finish(&mut logic, Some(HookFailure::new(Hook::Run, e)))
                .map(|()| Step::Done);
        }

        let mut cell = self.lock_cell();
        match cell.next_ns {
            Some(at_ns) if !cell.cancel_requested => {
                cell.status = Status::Repeating;
                drop(cell);
                self.publish(
                    Event::new(EventKind::TaskRepeating)
                        .with_task(self.name.clone())
                        .with_times(theoretical_ns, actual_ns)
                        .with_next(at_ns),
                );
                Ok(Step::Repeat { at_ns })
            }
            _ => {
                cell.claim_termination();
                drop(cell);
                self.finish(&mut logic, None).map(|()| Step::Done)
            }
        }
    }

    /// Requests cancellation.
    ///
    /// - Never run, or waiting for its next run: terminates now (`on_end`, `on_done`) without
    ///   calling `on_begin` or the body.
    /// - A hook is executing: latched and observed when `on_begin`/the body returns.
    /// - Terminating or done: no-op.
    ///
    /// ### Errors
    /// [`RunError::Hook`] if `on_end`/`on_done` failed during the termination it triggered.
    pub fn cancel(&self) -> Result<(), RunError> {
        {
            let mut cell = self.lock_cell();
            match cell.status {
                Status::Done | Status::OnEnd | Status::OnDone => return Ok(()),
                Status::OnBegin | Status::Running => {
                    cell.cancel_requested = true;
                    return Ok(());
                }
                Status::Pending | Status::Repeating => {
                    cell.cancel_requested = true;
                    cell.claim_termination();
                }
            }
        }
        let mut logic = self.lock_logic();
        self.finish(&mut logic, None)
    }

    /// Current status.
    pub fn status(&self) -> Status {
        self.lock_cell().status
    }

    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    pub fn is_on_begin_being_called(&self) -> bool {
        self.status() == Status::OnBegin
    }

    pub fn is_running(&self) -> bool {
        self.status() == Status::Running
    }

    /// True between a run that requested repetition and the next run.
    pub fn is_repeating(&self) -> bool {
        self.status() == Status::Repeating
    }

    pub fn is_on_end_being_called(&self) -> bool {
        self.status() == Status::OnEnd
    }

    pub fn is_on_done_being_called(&self) -> bool {
        self.status() == Status::OnDone
    }

    pub fn is_done(&self) -> bool {
        self.status() == Status::Done
    }

    /// True once `on_end` has begun, through and including `Done`.
    pub fn is_terminating_or_done(&self) -> bool {
        self.status().is_terminating_or_done()
    }

    /// True if the task is done and its termination was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        let cell = self.lock_cell();
        cell.status == Status::Done && cell.cancelled
    }

    /// True if cancellation was requested, whether or not it was observed yet.
    pub fn is_cancellation_requested(&self) -> bool {
        self.lock_cell().cancel_requested
    }

    /// Next theoretical time requested by the last run, if it asked to repeat.
    pub fn next_theoretical_time_ns(&self) -> Option<i64> {
        let cell = self.lock_cell();
        match cell.status {
            Status::Repeating => cell.next_ns,
            _ => None,
        }
    }

    /// Theoretical time of the last run.
    pub fn theoretical_time_ns(&self) -> i64 {
        self.lock_cell().theoretical_ns
    }

    /// Gives read access to the logic between runs.
    ///
    /// Blocks while a hook executes; must not be called from this task's own hooks.
    pub fn with_logic<R>(&self, f: impl FnOnce(&L) -> R) -> R {
        f(&self.lock_logic())
    }

    /// Runs the termination sequence. The caller has already claimed it.
    fn finish(&self, logic: &mut L, first: Option<HookFailure>) -> Result<(), RunError> {
        self.publish(Event::new(EventKind::TaskEnding).with_task(self.name.clone()));

        let mut failures: Vec<HookFailure> = first.into_iter().collect();
        if let Err(e) = self.call(Hook::OnEnd, logic, |l, cx| l.on_end(cx)) {
            failures.push(HookFailure::new(Hook::OnEnd, e));
        }
        self.lock_cell().status = Status::OnDone;
        if let Err(e) = self.call(Hook::OnDone, logic, |l, cx| l.on_done(cx)) {
            failures.push(HookFailure::new(Hook::OnDone, e));
        }
        let cancelled = {
            let mut cell = self.lock_cell();
            cell.status = Status::Done;
            cell.next_ns = None;
            cell.cancelled
        };

        for (i, failure) in failures.iter().enumerate() {
            let kind = if i == 0 {
                EventKind::HookFailed
            } else {
                EventKind::HookSuppressed
            };
            self.publish(
                Event::new(kind)
                    .with_task(self.name.clone())
                    .with_hook(failure.hook)
                    .with_reason(failure.error.to_string()),
            );
        }
        if cancelled {
            self.publish(Event::new(EventKind::TaskCancelled).with_task(self.name.clone()));
        }
        self.publish(Event::new(EventKind::TaskDone).with_task(self.name.clone()));

        let mut failures = failures.into_iter();
        match failures.next() {
            None => Ok(()),
            Some(first) => Err(RunError::Hook {
                first,
                suppressed: failures.collect(),
            }),
        }
    }

    /// Calls one hook with a fresh context, containing panics.
    fn call<F>(&self, hook: Hook, logic: &mut L, f: F) -> Result<(), TaskError>
    where
        F: FnOnce(&mut L, &mut TaskContext<'_>) -> Result<(), TaskError>,
    {
        let (theoretical, actual) = {
            let cell = self.lock_cell();
            (cell.theoretical_ns, cell.actual_ns)
        };
        let mut cx = TaskContext::new(&self.cell, hook, theoretical, actual);
        match panic::catch_unwind(AssertUnwindSafe(|| f(logic, &mut cx))) {
            Ok(res) => res,
            Err(payload) => Err(TaskError::from_panic(payload)),
        }
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(ev);
        }
    }

    fn lock_cell(&self) -> MutexGuard<'_, Cell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_logic(&self) -> MutexGuard<'_, L> {
        self.logic.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
