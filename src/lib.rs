//! # ticktask
//!
//! **ticktask** is a small scheduling library for repeatable, time-driven work.
//!
//! A task body runs at a *theoretical* time and decides, while running, whether and when
//! it runs next. The same task runs unchanged on a deterministic soft scheduler (virtual
//! time, single thread) or on a hard scheduler (tokio, real threads, system clock).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  TaskLogic   │   │  TaskFn      │   │ ProcessLogic │
//!     │ (user hooks) │   │ (closure)    │   │ (start/stop) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!     ┌──────────────────────────────────────────────────────┐
//!     │ RepeatableTask ─► RepeatableRunnable (state machine) │◄── Process
//!     │  on_begin ─► run ─► run ─► ... ─► on_end ─► on_done  │    (generations)
//!     └──────┬────────────────────────────────────┬──────────┘
//!            │ execute_at_ns(next)                │ publish(Event)
//!            ▼                                    ▼
//!     ┌──────────────────────────────┐   ┌─────────────────────────┐
//!     │ Scheduler                    │   │ Bus (broadcast channel) │
//!     │  SoftScheduler + ManualClock │──►│ (Config::bus_capacity)  │
//!     │  HardScheduler + SystemClock │   └────────────┬────────────┘
//!     └──────────────────────────────┘                ▼
//!                                            SubscriberSet::listen
//!                                          ┌──────────┼──────────┐
//!                                          ▼          ▼          ▼
//!                                      LogWriter   Metrics    Custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Pending ──► OnBegin ──► Running ──┬─► Repeating ──► Running ──► ...
//!                                   │
//!                                   └─► OnEnd ──► OnDone ──► Done
//!
//! - body sets no next time          ─► termination
//! - cancel while Pending/Repeating  ─► termination right away
//! - cancel inside on_begin/run      ─► termination once the hook returns
//! - hook error or panic             ─► termination, first failure returned
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------|--------------------------------------------|
//! | **Tasks**         | Hook-based state machine with self-rescheduling.          | [`TaskLogic`], [`RepeatableTask`], [`TaskFn`] |
//! | **Processes**     | Start/stop surface with started/alive separation.         | [`Process`], [`ProcessLogic`]              |
//! | **Scheduling**    | Deterministic virtual time or tokio-backed real time.     | [`Scheduler`], [`SoftScheduler`], [`HardScheduler`] |
//! | **Time**          | Nanosecond theoretical clocks.                            | [`Clock`], [`ManualClock`], [`SystemClock`] |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).    | [`Subscribe`], [`SubscriberSet`]           |
//! | **Errors**        | Typed hook, contract and runtime errors.                  | [`TaskError`], [`RunError`], [`RuntimeError`] |
//! | **Configuration** | Centralize scheduler settings.                            | [`Config`]                                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use ticktask::{Config, ManualClock, RepeatableTask, SoftScheduler, TaskContext, TaskError, TaskFn};
//!
//! let sched = Arc::new(SoftScheduler::new(Config::default(), Arc::new(ManualClock::new(1_000))));
//!
//! // Runs at 1000, 1010 and 1020, then ends.
//! let mut runs = 0;
//! let task = RepeatableTask::new(
//!     "ticker",
//!     TaskFn::new(move |cx: &mut TaskContext<'_>, theoretical_ns: i64, _actual_ns: i64| {
//!         runs += 1;
//!         if runs < 3 {
//!             cx.set_next_theoretical_time_ns(theoretical_ns + 10);
//!         }
//!         Ok::<_, TaskError>(())
//!     }),
//!     sched.clone(),
//! );
//! task.start()?;
//!
//! assert_eq!(sched.advance_to(1_020), 3);
//! assert!(task.is_done());
//! # Ok::<(), ticktask::RunError>(())
//! ```
mod config;
mod error;
mod events;
mod process;
mod scheduler;
mod subscribers;
mod tasks;
mod time;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{ContractViolation, Hook, HookFailure, RunError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use process::{Process, ProcessContext, ProcessLogic};
pub use scheduler::{
    FAILURE_LOG_CAPACITY, HardScheduler, Runnable, RunnableRef, Scheduler, SoftScheduler,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{RepeatableRunnable, RepeatableTask, Status, Step, TaskContext, TaskFn, TaskLogic};
pub use time::{Clock, ManualClock, NANOS_PER_SECOND, SystemClock, ns_to_seconds, seconds_to_ns};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
