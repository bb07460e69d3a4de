//! # Hard scheduler: real threads, real clock.
//!
//! [`HardScheduler`] runs submissions on a tokio runtime against a [`SystemClock`].
//!
//! ## Architecture
//! ```text
//! execute_at_ns(task, t)
//!   └─► tracker.spawn_on(handle)
//!         ├─► sleep(real_delay(t - now))        (cancellable)
//!         ├─► acquire semaphore permit          (optional, cancellable)
//!         └─► spawn_blocking(task.run())        (hooks are synchronous)
//!               └─ Err ──► publish RunFailed
//!
//! shutdown()
//!   ├─► publish ShutdownRequested
//!   ├─► cancel token: sleeping submissions call task.cancel() instead of running
//!   └─► wait up to `grace` for in-flight work
//!         ├─ ok      ──► AllStoppedWithin
//!         └─ timeout ──► GraceExceeded + RuntimeError::GraceExceeded
//! ```
//!
//! ## Rules
//! - Runs of one task never overlap: a task resubmits itself only after its run returned.
//! - Submissions after shutdown are dropped; the runnable is cancelled on the blocking pool
//!   as tracked work, so `shutdown()` also waits for that termination.
//! - The configured time speed scales sleeps: theoretical delays are divided by it.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::Config;
use crate::error::{RunError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::{RunnableRef, Scheduler};
use crate::time::{Clock, SystemClock};

/// Multi-threaded scheduler backed by a tokio runtime.
pub struct HardScheduler {
    cfg: Config,
    clock: SystemClock,
    bus: Bus,
    handle: Handle,
    token: CancellationToken,
    tracker: TaskTracker,
    semaphore: Option<Arc<Semaphore>>,
}

impl HardScheduler {
    /// Creates a scheduler on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime; use [`HardScheduler::with_handle`] there.
    pub fn new(cfg: Config) -> Self {
        Self::with_handle(cfg, Handle::current())
    }

    /// Creates a scheduler spawning onto `handle`.
    pub fn with_handle(cfg: Config, handle: Handle) -> Self {
        let clock = SystemClock::with_epoch(std::time::Instant::now(), cfg.time_speed_clamped());
        let semaphore = cfg
            .concurrency_limit()
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            bus: Bus::new(cfg.bus_capacity_clamped()),
            cfg,
            clock,
            handle,
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            semaphore,
        }
    }

    /// The system clock due times are measured against.
    pub fn system_clock(&self) -> &SystemClock {
        &self.clock
    }

    /// Number of submissions sleeping or running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// True once [`shutdown`](Self::shutdown) has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops accepting work, cancels sleeping submissions and waits up to `grace` for
    /// in-flight runs.
    ///
    /// ### Errors
    /// [`RuntimeError::GraceExceeded`] if work was still in flight when the grace ran out.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.token.cancel();
        self.tracker.close();

        let grace = self.cfg.grace;
        match time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_elapsed) => {
                self.bus.publish(Event::new(EventKind::GraceExceeded));
                Err(RuntimeError::GraceExceeded {
                    grace,
                    stuck: self.tracker.len(),
                })
            }
        }
    }
}

impl Scheduler for HardScheduler {
    fn clock(&self) -> &dyn Clock {
        &self.clock
    }

    fn bus(&self) -> &Bus {
        &self.bus
    }

    fn execute_at_ns(&self, task: RunnableRef, time_ns: i64) {
        let bus = self.bus.clone();
        if self.token.is_cancelled() {
            // Tracked, so a later `shutdown()` waits for the termination hooks.
            self.tracker.spawn_on(cancel_blocking(task, bus), &self.handle);
            return;
        }

        let delay = self.clock.real_delay(time_ns.saturating_sub(self.clock.time_ns()));
        let token = self.token.clone();
        let semaphore = self.semaphore.clone();

        self.tracker.spawn_on(
            async move {
                let sleep = time::sleep(delay);
                tokio::pin!(sleep);
                select! {
                    _ = &mut sleep => {}
                    _ = token.cancelled() => {
                        cancel_blocking(task, bus).await;
                        return;
                    }
                }

                let _permit = match semaphore {
                    Some(sem) => {
                        let acquire = sem.acquire_owned();
                        tokio::pin!(acquire);
                        select! {
                            res = &mut acquire => match res {
                                Ok(permit) => Some(permit),
                                Err(_closed) => return,
                            },
                            _ = token.cancelled() => {
                                cancel_blocking(task, bus).await;
                                return;
                            }
                        }
                    }
                    None => None,
                };

                let name: Arc<str> = Arc::from(task.name());
                match tokio::task::spawn_blocking(move || task.run()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => publish_failed(&bus, &name, &e),
                    Err(join) => bus.publish(
                        Event::new(EventKind::RunFailed)
                            .with_task(name)
                            .with_reason(join.to_string()),
                    ),
                }
            },
            &self.handle,
        );
    }
}

/// Cancels a dropped submission on the blocking pool (termination hooks are synchronous).
async fn cancel_blocking(task: RunnableRef, bus: Bus) {
    let name: Arc<str> = Arc::from(task.name());
    match tokio::task::spawn_blocking(move || task.cancel()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => publish_failed(&bus, &name, &e),
        Err(join) => bus.publish(
            Event::new(EventKind::RunFailed)
                .with_task(name)
                .with_reason(join.to_string()),
        ),
    }
}

fn publish_failed(bus: &Bus, name: &str, err: &RunError) {
    bus.publish(
        Event::new(EventKind::RunFailed)
            .with_task(name)
            .with_reason(err.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Hook, TaskError};
    use crate::tasks::{Probe, RepeatableTask, TaskContext, TaskFn};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cfg() -> Config {
        Config {
            grace: Duration::from_secs(5),
            ..Config::default()
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_repeating_task_runs_to_completion() {
        let sched = Arc::new(HardScheduler::new(cfg()));
        let task = RepeatableTask::new(
            "hard-ticker",
            Probe {
                repeats: 3,
                period_ns: 1_000_000,
                ..Probe::default()
            },
            sched.clone(),
        );
        task.start().unwrap();

        wait_until(|| task.is_done()).await;
        task.with_logic(|p| {
            assert_eq!(p.count(Hook::OnBegin), 1);
            assert_eq!(p.count(Hook::Run), 4);
            assert_eq!(p.count(Hook::OnEnd), 1);
            assert_eq!(p.count(Hook::OnDone), 1);
            let runs: Vec<i64> = p
                .calls
                .iter()
                .filter(|(h, _, _)| *h == Hook::Run)
                .map(|(_, t, _)| *t)
                .collect();
            assert!(runs.windows(2).all(|w| w[1] - w[0] == 1_000_000));
            for (_, theoretical, actual) in &p.calls[1..] {
                assert!(actual >= theoretical);
            }
        });
        sched.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_cancels_sleeping_submissions() {
        let sched = Arc::new(HardScheduler::new(cfg()));
        let task = RepeatableTask::new("sleeper", Probe::default(), sched.clone());
        task.start_after_ns(60 * 1_000_000_000).unwrap();
        assert_eq!(sched.in_flight(), 1);

        sched.shutdown().await.unwrap();
        assert!(sched.is_shut_down());
        assert!(task.is_cancelled());
        task.with_logic(|p| assert_eq!(p.hooks(), vec![Hook::OnEnd, Hook::OnDone]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_grace_exceeded() {
        let sched = Arc::new(HardScheduler::new(Config {
            grace: Duration::from_millis(20),
            ..Config::default()
        }));
        let mut rx = sched.bus().subscribe();
        let task = RepeatableTask::new(
            "stuck",
            TaskFn::new(|_cx: &mut TaskContext<'_>, _t: i64, _a: i64| {
                std::thread::sleep(Duration::from_millis(300));
                Ok::<_, TaskError>(())
            }),
            sched.clone(),
        );
        task.start().unwrap();
        wait_until(|| task.runnable().is_running()).await;

        let err = sched.shutdown().await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_grace_exceeded");

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert!(kinds.contains(&EventKind::GraceExceeded));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_limit_serializes_runs() {
        let sched = Arc::new(HardScheduler::new(Config {
            max_concurrent: 1,
            ..cfg()
        }));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();

        for i in 0..4 {
            let (active, peak) = (active.clone(), peak.clone());
            let task = RepeatableTask::new(
                format!("limited-{i}"),
                TaskFn::new(move |_cx: &mut TaskContext<'_>, _t: i64, _a: i64| {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(5));
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(())
                }),
                sched.clone(),
            );
            task.start().unwrap();
            tasks.push(task);
        }

        wait_until(|| tasks.iter().all(|t| t.is_done())).await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        sched.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_run_is_published() {
        let sched = Arc::new(HardScheduler::new(cfg()));
        let mut rx = sched.bus().subscribe();
        let task = RepeatableTask::new(
            "failing",
            Probe {
                fail: [Hook::OnBegin].into_iter().collect(),
                ..Probe::default()
            },
            sched.clone(),
        );
        task.start().unwrap();
        wait_until(|| task.is_done()).await;
        sched.shutdown().await.unwrap();

        let mut failed = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::RunFailed {
                failed = Some(ev);
            }
        }
        let ev = failed.expect("RunFailed published");
        assert_eq!(ev.task.as_deref(), Some("failing"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submission_after_shutdown_is_cancelled() {
        let sched = Arc::new(HardScheduler::new(cfg()));
        sched.shutdown().await.unwrap();

        let task = RepeatableTask::new("late", Probe::default(), sched.clone());
        task.start().unwrap();
        wait_until(|| task.is_done()).await;
        assert!(task.is_cancelled());
        task.with_logic(|p| assert_eq!(p.hooks(), vec![Hook::OnEnd, Hook::OnDone]));
    }

    /// Body-less logic whose `on_end` takes a while.
    struct SlowEnd {
        ended: Arc<AtomicUsize>,
    }

    impl crate::tasks::TaskLogic for SlowEnd {
        fn run(&mut self, _cx: &mut TaskContext<'_>, _t: i64, _a: i64) -> Result<(), TaskError> {
            Ok(())
        }

        fn on_end(&mut self, _cx: &mut TaskContext<'_>) -> Result<(), TaskError> {
            std::thread::sleep(Duration::from_millis(50));
            self.ended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_waits_for_late_submission_termination() {
        let sched = Arc::new(HardScheduler::new(cfg()));
        sched.shutdown().await.unwrap();

        let ended = Arc::new(AtomicUsize::new(0));
        let task = RepeatableTask::new(
            "late-slow",
            SlowEnd {
                ended: ended.clone(),
            },
            sched.clone(),
        );
        task.start().unwrap();
        assert_eq!(sched.in_flight(), 1);

        sched.shutdown().await.unwrap();
        assert_eq!(ended.load(Ordering::SeqCst), 1);
        assert!(task.is_cancelled());
        assert_eq!(sched.in_flight(), 0);
    }
}
