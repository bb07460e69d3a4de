//! # Repeatable task: the state machine bound to a scheduler.
//!
//! [`RepeatableTask`] turns "the body requested a next theoretical time" into "resubmit
//! this task to the scheduler at that time". The resubmission goes through
//! [`TaskLogic::reschedule_at_ns`], so logic can redirect it (for example to run again as
//! soon as possible instead of at an absolute time).
//!
//! ## Flow
//! ```text
//! start() ──► scheduler.execute(task)
//!                  │ (due)
//!                  ▼
//!             Runnable::run
//!               ├─ actual      = scheduler.clock().time_ns()
//!               ├─ theoretical = requested due time (or actual on an asap run)
//!               └─ RepeatableRunnable::run_at
//!                     ├─ Step::Repeat{at} ──► logic.reschedule_at_ns(scheduler, task, at)
//!                     └─ Step::Done       ──► nothing left to do
//! ```

use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::error::{ContractViolation, RunError};
use crate::scheduler::{Runnable, RunnableRef, Scheduler};
use crate::tasks::logic::TaskLogic;
use crate::tasks::runnable::RepeatableRunnable;
use crate::tasks::state::{Status, Step};

/// A [`RepeatableRunnable`] that resubmits itself to its scheduler.
///
/// Holds its scheduler weakly: dropping the scheduler stops the task from being driven.
pub struct RepeatableTask<L> {
    inner: RepeatableRunnable<L>,
    scheduler: Weak<dyn Scheduler>,
    due_ns: Mutex<Option<i64>>,
}

impl<L: TaskLogic> RepeatableTask<L> {
    /// Creates a pending task publishing to the scheduler's bus.
    pub fn new(
        name: impl Into<Arc<str>>,
        logic: L,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        let inner = RepeatableRunnable::new(name, logic).with_bus(scheduler.bus().clone());
        Arc::new(Self {
            inner,
            scheduler: Arc::downgrade(&scheduler),
            due_ns: Mutex::new(None),
        })
    }

    /// Submits the first run as soon as possible.
    pub fn start(self: &Arc<Self>) -> Result<(), RunError> {
        let scheduler = self.scheduler()?;
        scheduler.execute(self.clone());
        Ok(())
    }

    /// Submits the first run with theoretical time `time_ns`.
    pub fn start_at_ns(self: &Arc<Self>, time_ns: i64) -> Result<(), RunError> {
        let scheduler = self.scheduler()?;
        self.set_due(time_ns);
        scheduler.execute_at_ns(self.clone(), time_ns);
        Ok(())
    }

    /// Submits the first run `delay_ns` after the scheduler's current time.
    pub fn start_after_ns(self: &Arc<Self>, delay_ns: i64) -> Result<(), RunError> {
        let now = self.scheduler()?.clock().time_ns();
        self.start_at_ns(now.saturating_add(delay_ns))
    }

    /// Requests cancellation; see [`RepeatableRunnable::cancel`].
    pub fn cancel(&self) -> Result<(), RunError> {
        self.inner.cancel()
    }

    /// The underlying state machine, for status queries.
    pub fn runnable(&self) -> &RepeatableRunnable<L> {
        &self.inner
    }

    pub fn status(&self) -> Status {
        self.inner.status()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.is_pending()
    }

    pub fn is_repeating(&self) -> bool {
        self.inner.is_repeating()
    }

    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Gives read access to the logic between runs.
    pub fn with_logic<R>(&self, f: impl FnOnce(&L) -> R) -> R {
        self.inner.with_logic(f)
    }

    fn scheduler(&self) -> Result<Arc<dyn Scheduler>, RunError> {
        self.scheduler.upgrade().ok_or_else(|| {
            ContractViolation::SchedulerGone {
                task: self.inner.name().to_string(),
            }
            .into()
        })
    }

    fn set_due(&self, time_ns: i64) {
        *self.due_ns.lock().unwrap_or_else(PoisonError::into_inner) = Some(time_ns);
    }

    fn take_due(&self) -> Option<i64> {
        self.due_ns
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<L: TaskLogic> Runnable for RepeatableTask<L> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(self: Arc<Self>) -> Result<(), RunError> {
        let scheduler = self.scheduler()?;
        let actual = scheduler.clock().time_ns();
        let theoretical = self.take_due().unwrap_or(actual);

        if let Step::Repeat { at_ns } = self.inner.run_at(theoretical, actual)? {
            self.set_due(at_ns);
            let task: RunnableRef = self.clone();
            self.inner
                .with_logic(|l| l.reschedule_at_ns(scheduler.as_ref(), task, at_ns));
        }
        Ok(())
    }

    fn cancel(&self) -> Result<(), RunError> {
        self.inner.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{Hook, TaskError};
    use crate::scheduler::SoftScheduler;
    use crate::tasks::{Probe, TaskContext};
    use crate::time::{Clock, ManualClock};

    fn soft(start_ns: i64) -> Arc<SoftScheduler> {
        Arc::new(SoftScheduler::new(
            Config::default(),
            Arc::new(ManualClock::new(start_ns)),
        ))
    }

    #[test]
    fn test_period_scenario_from_t1000() {
        let sched = soft(1000);
        let task = RepeatableTask::new(
            "ticker",
            Probe {
                repeats: 1,
                period_ns: 10,
                ..Probe::default()
            },
            sched.clone(),
        );
        task.start().unwrap();

        assert_eq!(sched.run_due(), 1);
        assert!(task.is_repeating());
        task.with_logic(|p| {
            assert_eq!(p.calls[1], (Hook::Run, 1000, 1000));
            assert_eq!(p.count(Hook::OnEnd), 0);
        });

        // Not due yet.
        sched.advance_to(1009);
        task.with_logic(|p| assert_eq!(p.count(Hook::Run), 1));

        sched.advance_to(1010);
        assert!(task.is_done());
        assert!(!task.is_cancelled());
        task.with_logic(|p| {
            assert_eq!(p.calls[2], (Hook::Run, 1010, 1010));
            assert_eq!(p.count(Hook::Run), 2);
            assert_eq!(p.count(Hook::OnEnd), 1);
            assert_eq!(p.count(Hook::OnDone), 1);
        });
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn test_late_run_keeps_theoretical_time() {
        let sched = soft(0);
        let task = RepeatableTask::new(
            "late",
            Probe {
                repeats: 1,
                period_ns: 100,
                ..Probe::default()
            },
            sched.clone(),
        );
        task.start_at_ns(50).unwrap();

        sched.advance_to(70);
        sched.manual_clock().set_ns(400);
        sched.run_due();

        task.with_logic(|p| {
            assert_eq!(p.calls[1], (Hook::Run, 50, 50));
            assert_eq!(p.calls[2], (Hook::Run, 150, 400));
        });
    }

    /// Body that asks for a far-away next time but reruns as soon as possible.
    struct Asap {
        runs: u32,
    }

    impl TaskLogic for Asap {
        fn run(&mut self, cx: &mut TaskContext<'_>, t: i64, _a: i64) -> Result<(), TaskError> {
            self.runs += 1;
            if self.runs < 3 {
                cx.set_next_theoretical_time_ns(t + 1_000_000);
            }
            Ok(())
        }

        fn reschedule_at_ns(&self, scheduler: &dyn Scheduler, task: RunnableRef, _time_ns: i64) {
            scheduler.execute(task);
        }
    }

    #[test]
    fn test_reschedule_override_runs_again_immediately() {
        let sched = soft(0);
        let task = RepeatableTask::new("asap", Asap { runs: 0 }, sched.clone());
        task.start().unwrap();

        assert_eq!(sched.run_due(), 3);
        assert!(task.is_done());
        assert_eq!(sched.manual_clock().time_ns(), 0);
    }

    #[test]
    fn test_cancel_leaves_stale_submission_harmless() {
        let sched = soft(0);
        let task = RepeatableTask::new(
            "cancelled",
            Probe {
                repeats: 10,
                period_ns: 5,
                ..Probe::default()
            },
            sched.clone(),
        );
        task.start().unwrap();
        sched.run_due();
        assert!(task.is_repeating());

        task.cancel().unwrap();
        assert!(task.is_cancelled());

        sched.advance_to(100);
        task.with_logic(|p| {
            assert_eq!(p.count(Hook::Run), 1);
            assert_eq!(p.count(Hook::OnDone), 1);
        });
        assert!(sched.take_failures().is_empty());
    }

    #[test]
    fn test_start_after_scheduler_dropped() {
        let sched = soft(0);
        let task = RepeatableTask::new("orphan", Probe::default(), sched.clone());
        drop(sched);
        assert!(matches!(
            task.start(),
            Err(RunError::Contract(ContractViolation::SchedulerGone { .. }))
        ));
    }
}
