//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [begin] task=render t=0 actual=12
//! [repeat] task=render t=16666666 actual=16671002 next=33333332
//! [hook-failed] task=render hook=run err="error: frame dropped"
//! [ending] task=render
//! [done] task=render
//! [process-stop] task=render
//! [shutdown-requested]
//! [all-stopped-within-grace]
//! ```
//!
//! ## Example
//! ```no_run
//! # async fn demo() {
//! use std::sync::Arc;
//! use ticktask::{Bus, LogWriter, Subscribe, SubscriberSet};
//!
//! let bus = Bus::new(1024);
//! let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//! let subscribers = SubscriberSet::listen(subs, bus.clone());
//! // ... publish through schedulers sharing `bus` ...
//! subscribers.shutdown().await;
//! # }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Not intended for production use; implement a
/// custom [`Subscribe`] for structured logging or metrics collection.
pub struct LogWriter;

fn or_dash<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TaskBegin => {
                println!(
                    "[begin] task={task} t={} actual={}",
                    or_dash(e.theoretical_ns),
                    or_dash(e.actual_ns)
                );
            }
            EventKind::TaskRepeating => {
                println!(
                    "[repeat] task={task} t={} actual={} next={}",
                    or_dash(e.theoretical_ns),
                    or_dash(e.actual_ns),
                    or_dash(e.next_ns)
                );
            }
            EventKind::TaskEnding => println!("[ending] task={task}"),
            EventKind::TaskDone => println!("[done] task={task}"),
            EventKind::TaskCancelled => println!("[cancelled] task={task}"),
            EventKind::HookFailed | EventKind::HookSuppressed => {
                let tag = if e.kind == EventKind::HookFailed {
                    "hook-failed"
                } else {
                    "hook-suppressed"
                };
                println!(
                    "[{tag}] task={task} hook={} err={:?}",
                    or_dash(e.hook),
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::RunFailed => {
                println!(
                    "[run-failed] task={task} err={:?}",
                    e.reason.as_deref().unwrap_or("")
                );
            }
            EventKind::ProcessStarted => println!("[process-start] task={task}"),
            EventKind::ProcessStopRequested => println!("[process-stop] task={task}"),
            EventKind::ProcessEnded => println!("[process-ended] task={task}"),
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => {
                println!("[grace-exceeded] {}", e.reason.as_deref().unwrap_or(""));
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                println!(
                    "[subscriber] {task} {}",
                    e.reason.as_deref().unwrap_or("")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Hook;

    #[tokio::test]
    async fn test_prints_sparse_events() {
        let events = [
            Event::new(EventKind::TaskBegin).with_task("t").with_times(0, 1),
            Event::new(EventKind::TaskRepeating).with_task("t"),
            Event::new(EventKind::HookSuppressed)
                .with_task("t")
                .with_hook(Hook::OnEnd)
                .with_reason("late"),
            Event::new(EventKind::GraceExceeded),
            Event::subscriber_overflow("audit", "full"),
        ];
        for ev in &events {
            LogWriter.on_event(ev).await;
        }
        assert_eq!(LogWriter.name(), "log-writer");
    }
}
