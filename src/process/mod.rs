//! # Processes: start/stop control over a repeatable task.
//!
//! A [`Process`] wraps user [`ProcessLogic`] in a fresh [`RepeatableTask`] on every
//! `start()`. It separates "did the caller ask to stop" (`is_started`) from "has the work
//! finished winding down" (`is_alive`).
//!
//! ## Lifecycle
//! ```text
//! start() ─► started = alive = true ─► new cycle (generation n) submitted
//!              │
//!              ▼
//!        on_begin ─► process ─► process ─► ...      (next due time = return value)
//!              │
//! stop() ──────┤  started = false (synchronously), cycle task cancelled
//!              ▼
//!        on_end ─► alive = false                    (asynchronously, when the task ends)
//! ```
//!
//! ## Rules
//! - `on_begin`, `process` and `on_end` of one process never run concurrently.
//! - `on_end` runs once per cycle in which `on_begin` ran, however the cycle ended:
//!   `stop()`, [`ProcessContext::stop`], `process` returning `None`, or a failure.
//! - `stop()` before the first run of a cycle skips every hook; `alive` drops immediately.
//! - A cycle that finishes after a newer `start()` never touches the newer cycle's flags.

mod context;
mod logic;

pub use context::ProcessContext;
pub use logic::ProcessLogic;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{RunError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::Scheduler;
use crate::tasks::{RepeatableTask, TaskContext, TaskLogic};

/// State shared by a process handle and its cycles.
struct Shared<P> {
    name: Arc<str>,
    logic: Mutex<P>,
    started: AtomicBool,
    alive: AtomicBool,
    generation: AtomicU64,
    /// Task of the current cycle. Also serializes start/stop/cycle end.
    current: Mutex<Option<Arc<RepeatableTask<Cycle<P>>>>>,
    bus: Bus,
}

impl<P> Shared<P> {
    fn lock_logic(&self) -> MutexGuard<'_, P> {
        self.logic.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<Arc<RepeatableTask<Cycle<P>>>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Flips `started` off for `generation` if it is still the current one.
    fn request_stop(&self, generation: u64) -> bool {
        let _current = self.lock_current();
        if !self.is_current(generation) {
            return false;
        }
        let was_started = self.started.swap(false, Ordering::AcqRel);
        if was_started {
            self.bus.publish(
                Event::new(EventKind::ProcessStopRequested).with_task(self.name.clone()),
            );
        }
        was_started
    }
}

/// Task logic of one started cycle.
struct Cycle<P> {
    shared: Arc<Shared<P>>,
    generation: u64,
    began: bool,
}

impl<P: ProcessLogic> Cycle<P> {
    /// Turns a stop requested through the process context into task cancellation.
    fn apply_stop(&self, stop: bool, cx: &mut TaskContext<'_>) {
        if stop {
            self.shared.request_stop(self.generation);
            cx.cancel();
        }
    }
}

impl<P: ProcessLogic> TaskLogic for Cycle<P> {
    fn on_begin(&mut self, cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        self.began = true;
        let mut pcx = ProcessContext::new(cx.theoretical_time_ns(), cx.actual_time_ns());
        let res = self.shared.lock_logic().on_begin(&mut pcx);
        self.apply_stop(pcx.stop_requested(), cx);
        res
    }

    fn run(
        &mut self,
        cx: &mut TaskContext<'_>,
        theoretical_ns: i64,
        actual_ns: i64,
    ) -> Result<(), TaskError> {
        let mut pcx = ProcessContext::new(theoretical_ns, actual_ns);
        let next = self
            .shared
            .lock_logic()
            .process(&mut pcx, theoretical_ns, actual_ns)?;
        match next {
            Some(at_ns) => cx.set_next_theoretical_time_ns(at_ns),
            None => cx.clear_theoretical_time(),
        }
        self.apply_stop(pcx.stop_requested(), cx);
        Ok(())
    }

    fn on_end(&mut self, cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        if !self.began {
            return Ok(());
        }
        let mut pcx = ProcessContext::new(cx.theoretical_time_ns(), cx.actual_time_ns());
        self.shared.lock_logic().on_end(&mut pcx)
    }

    fn on_done(&mut self, _cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
        let mut current = self.shared.lock_current();
        if self.shared.is_current(self.generation) {
            self.shared.started.store(false, Ordering::Release);
            self.shared.alive.store(false, Ordering::Release);
            *current = None;
            drop(current);
            self.shared
                .bus
                .publish(Event::new(EventKind::ProcessEnded).with_task(self.shared.name.clone()));
        }
        Ok(())
    }
}

/// Start/stop control surface over user [`ProcessLogic`].
pub struct Process<P> {
    shared: Arc<Shared<P>>,
    scheduler: Arc<dyn Scheduler>,
}

impl<P: ProcessLogic> Process<P> {
    /// Creates a stopped process submitting to `scheduler`.
    pub fn new(name: impl Into<Arc<str>>, logic: P, scheduler: Arc<dyn Scheduler>) -> Self {
        let shared = Arc::new(Shared {
            name: name.into(),
            logic: Mutex::new(logic),
            started: AtomicBool::new(false),
            alive: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
            bus: scheduler.bus().clone(),
        });
        Self { shared, scheduler }
    }

    /// Process name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Starts a new cycle as soon as possible. No-op if already started.
    pub fn start(&self) -> Result<(), RunError> {
        self.start_with(|task| task.start())
    }

    /// Starts a new cycle whose first run is due at `time_ns`. No-op if already started.
    pub fn start_at_ns(&self, time_ns: i64) -> Result<(), RunError> {
        self.start_with(|task| task.start_at_ns(time_ns))
    }

    fn start_with(
        &self,
        submit: impl FnOnce(&Arc<RepeatableTask<Cycle<P>>>) -> Result<(), RunError>,
    ) -> Result<(), RunError> {
        let mut current = self.shared.lock_current();
        if self.shared.started.load(Ordering::Acquire) {
            return Ok(());
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let task = RepeatableTask::new(
            self.shared.name.clone(),
            Cycle {
                shared: self.shared.clone(),
                generation,
                began: false,
            },
            self.scheduler.clone(),
        );
        self.shared.started.store(true, Ordering::Release);
        self.shared.alive.store(true, Ordering::Release);
        *current = Some(task.clone());
        drop(current);

        self.shared
            .bus
            .publish(Event::new(EventKind::ProcessStarted).with_task(self.shared.name.clone()));
        submit(&task)
    }

    /// Requests the current cycle to stop. No-op if not started.
    ///
    /// `is_started()` is false when this returns; `is_alive()` turns false once `on_end`
    /// of the cycle has completed, which may be later (or already, if the cycle had not
    /// run yet or is not executing a hook).
    ///
    /// ### Errors
    /// [`RunError::Hook`] if the termination this call ran synchronously failed.
    pub fn stop(&self) -> Result<(), RunError> {
        let task = {
            let current = self.shared.lock_current();
            if !self.shared.started.swap(false, Ordering::AcqRel) {
                return Ok(());
            }
            self.shared.bus.publish(
                Event::new(EventKind::ProcessStopRequested).with_task(self.shared.name.clone()),
            );
            current.clone()
        };
        match task {
            Some(task) => task.cancel(),
            None => Ok(()),
        }
    }

    /// True between `start()` and `stop()` (or the cycle ending by itself).
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    /// True from `start()` until the cycle's `on_end` has completed.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::Acquire)
    }

    /// Gives read access to the logic. Must not be called from this process's own hooks.
    pub fn with_logic<R>(&self, f: impl FnOnce(&P) -> R) -> R {
        f(&self.shared.lock_logic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Hook;
    use crate::scheduler::SoftScheduler;
    use crate::time::ManualClock;

    #[derive(Default)]
    struct Loop {
        begins: u32,
        bodies: Vec<(i64, i64)>,
        /// Bodies of the current cycle.
        cycle_bodies: usize,
        ends: u32,
        period_ns: i64,
        /// Stop from inside `process` once this many bodies ran.
        stop_after: Option<usize>,
        /// Return `None` once this many bodies ran in the current cycle.
        finish_after: Option<usize>,
        fail_body: bool,
        /// Stop then start again through the handle once this many bodies ran.
        restart_after: Option<usize>,
        /// Process handle to stop through, instead of the context.
        handle: Option<Arc<Process<Loop>>>,
    }

    impl ProcessLogic for Loop {
        fn on_begin(&mut self, _cx: &mut ProcessContext) -> Result<(), TaskError> {
            self.begins += 1;
            self.cycle_bodies = 0;
            Ok(())
        }

        fn process(
            &mut self,
            cx: &mut ProcessContext,
            theoretical_ns: i64,
            actual_ns: i64,
        ) -> Result<Option<i64>, TaskError> {
            self.bodies.push((theoretical_ns, actual_ns));
            self.cycle_bodies += 1;
            if self.fail_body {
                return Err(TaskError::fail("body"));
            }
            if self.stop_after == Some(self.bodies.len()) {
                match &self.handle {
                    Some(process) => process.stop().map_err(|e| TaskError::fail(e.to_string()))?,
                    None => cx.stop(),
                }
            }
            if self.restart_after == Some(self.bodies.len()) {
                if let Some(process) = &self.handle {
                    process.stop().map_err(|e| TaskError::fail(e.to_string()))?;
                    process.start().map_err(|e| TaskError::fail(e.to_string()))?;
                }
            }
            if self.finish_after == Some(self.cycle_bodies) {
                return Ok(None);
            }
            Ok(Some(theoretical_ns + self.period_ns))
        }

        fn on_end(&mut self, _cx: &mut ProcessContext) -> Result<(), TaskError> {
            self.ends += 1;
            Ok(())
        }
    }

    fn soft() -> Arc<SoftScheduler> {
        Arc::new(SoftScheduler::new(
            Config::default(),
            Arc::new(ManualClock::new(0)),
        ))
    }

    fn looping(sched: &Arc<SoftScheduler>, logic: Loop) -> Process<Loop> {
        Process::new(
            "loop",
            Loop {
                period_ns: 10,
                ..logic
            },
            sched.clone(),
        )
    }

    #[test]
    fn test_start_runs_until_stop() {
        let sched = soft();
        let process = looping(&sched, Loop::default());
        process.start().unwrap();
        assert!(process.is_started());
        assert!(process.is_alive());

        sched.advance_to(35);
        process.with_logic(|l| {
            assert_eq!(l.begins, 1);
            assert_eq!(l.bodies, vec![(0, 0), (10, 10), (20, 20), (30, 30)]);
            assert_eq!(l.ends, 0);
        });

        process.stop().unwrap();
        assert!(!process.is_started());
        assert!(!process.is_alive());
        process.with_logic(|l| assert_eq!(l.ends, 1));

        sched.advance_to(100);
        process.with_logic(|l| assert_eq!(l.bodies.len(), 4));
        assert!(sched.take_failures().is_empty());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let sched = soft();
        let process = looping(&sched, Loop::default());
        process.start().unwrap();
        process.start().unwrap();
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn test_stop_before_first_run_calls_nothing() {
        let sched = soft();
        let process = looping(&sched, Loop::default());
        process.start().unwrap();
        process.stop().unwrap();

        assert!(!process.is_started());
        assert!(!process.is_alive());
        sched.run_until_idle(10);
        process.with_logic(|l| {
            assert_eq!(l.begins, 0);
            assert!(l.bodies.is_empty());
            assert_eq!(l.ends, 0);
        });
    }

    #[test]
    fn test_stop_when_not_started_is_noop() {
        let sched = soft();
        let process = looping(&sched, Loop::default());
        process.stop().unwrap();
        process.stop().unwrap();
        assert!(!process.is_alive());
    }

    #[test]
    fn test_stop_from_inside_process_runs_on_end_once() {
        let sched = soft();
        let process = looping(
            &sched,
            Loop {
                stop_after: Some(2),
                ..Loop::default()
            },
        );
        process.start().unwrap();
        sched.run_until_idle(10);

        assert!(!process.is_started());
        assert!(!process.is_alive());
        process.with_logic(|l| {
            assert_eq!(l.bodies.len(), 2);
            assert_eq!(l.ends, 1);
        });
    }

    #[test]
    fn test_stop_through_handle_from_inside_process() {
        let sched = soft();
        let process = Arc::new(looping(
            &sched,
            Loop {
                stop_after: Some(1),
                ..Loop::default()
            },
        ));
        process.shared.lock_logic().handle = Some(process.clone());
        process.start().unwrap();
        sched.run_until_idle(10);

        assert!(!process.is_alive());
        process.with_logic(|l| {
            assert_eq!(l.bodies.len(), 1);
            assert_eq!(l.ends, 1);
        });
        process.shared.lock_logic().handle = None;
    }

    #[test]
    fn test_finishing_by_itself_allows_restart() {
        let sched = soft();
        let process = looping(
            &sched,
            Loop {
                finish_after: Some(1),
                ..Loop::default()
            },
        );
        process.start().unwrap();
        sched.run_due();
        assert!(!process.is_started());
        assert!(!process.is_alive());

        process.start().unwrap();
        sched.run_due();
        assert!(!process.is_alive());
        assert_eq!(sched.pending(), 0);
        process.with_logic(|l| {
            assert_eq!(l.begins, 2);
            assert_eq!(l.bodies.len(), 2);
            assert_eq!(l.ends, 2);
        });
    }

    #[test]
    fn test_body_failure_still_ends() {
        let sched = soft();
        let process = looping(
            &sched,
            Loop {
                fail_body: true,
                ..Loop::default()
            },
        );
        process.start().unwrap();
        sched.run_due();

        assert!(!process.is_alive());
        process.with_logic(|l| assert_eq!(l.ends, 1));
        let failures = sched.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].1.hook(), Some(Hook::Run));
    }

    #[test]
    fn test_stale_cycle_does_not_clear_new_cycle() {
        let sched = soft();
        let process = Arc::new(looping(
            &sched,
            Loop {
                restart_after: Some(1),
                ..Loop::default()
            },
        ));
        process.shared.lock_logic().handle = Some(process.clone());
        process.start().unwrap();

        // Cycle 1 stops and cycle 2 starts while cycle 1 is still inside `process`.
        sched.run_due();
        assert!(process.is_started());
        assert!(process.is_alive());
        process.with_logic(|l| {
            assert_eq!(l.begins, 2);
            assert_eq!(l.ends, 1);
        });

        process.shared.lock_logic().handle = None;
        process.stop().unwrap();
        assert!(!process.is_alive());
        process.with_logic(|l| assert_eq!(l.ends, 2));
    }

    #[test]
    fn test_restart_after_stop() {
        let sched = soft();
        let process = looping(&sched, Loop::default());
        process.start().unwrap();
        sched.run_due();

        // Cycle 1 is repeating; stop terminates it right away, then restart.
        process.stop().unwrap();
        process.start().unwrap();
        assert!(process.is_alive());

        sched.advance_to(10);
        assert!(process.is_started());
        assert!(process.is_alive());
        process.with_logic(|l| {
            assert_eq!(l.begins, 2);
            assert_eq!(l.ends, 1);
            // Cycle 2's first run happens at 0; the stale cycle-1 entry at 10 is a no-op,
            // cycle 2's second run at 10 executes.
            assert_eq!(l.bodies, vec![(0, 0), (0, 0), (10, 10)]);
        });
    }

    #[test]
    fn test_events() {
        let sched = soft();
        let mut rx = sched.bus().subscribe();
        let process = looping(&sched, Loop::default());
        process.start().unwrap();
        sched.run_due();
        process.stop().unwrap();

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .filter(|k| {
                matches!(
                    k,
                    EventKind::ProcessStarted
                        | EventKind::ProcessStopRequested
                        | EventKind::ProcessEnded
                )
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ProcessStarted,
                EventKind::ProcessStopRequested,
                EventKind::ProcessEnded
            ]
        );
    }
}
