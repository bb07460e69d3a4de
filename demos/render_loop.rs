//! # Example: render_loop
//!
//! Drives a fixed-rate "render loop" as a [`Process`] on the [`HardScheduler`].
//!
//! Shows how to:
//! - Implement [`ProcessLogic`] returning the next theoretical frame time.
//! - Attach [`LogWriter`] through [`SubscriberSet::listen`].
//! - Stop a process and shut the scheduler down within a grace period.
//!
//! ## Flow
//! ```text
//! Process::start() ──► HardScheduler (sleep until frame time) ──► on_begin
//!                                                                    │
//!                          ┌─────────────── process(frame n) ◄───────┘
//!                          └─► Some(t + frame) ──► sleep ──► process(frame n+1) ...
//! Process::stop()   ──► on_end ──► ProcessEnded
//! HardScheduler::shutdown() ──► AllStoppedWithin
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example render_loop --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use ticktask::{
    Config, HardScheduler, LogWriter, NANOS_PER_SECOND, Process, ProcessContext, ProcessLogic,
    Scheduler, Subscribe, SubscriberSet, TaskError,
};

/// Renders frames at a fixed theoretical rate and reports how late each one started.
struct Renderer {
    frame_ns: i64,
    frames: u64,
    worst_lag_ns: i64,
}

impl ProcessLogic for Renderer {
    fn on_begin(&mut self, cx: &mut ProcessContext) -> Result<(), TaskError> {
        println!("renderer: first frame at t={}ns", cx.theoretical_time_ns());
        Ok(())
    }

    fn process(
        &mut self,
        _cx: &mut ProcessContext,
        theoretical_ns: i64,
        actual_ns: i64,
    ) -> Result<Option<i64>, TaskError> {
        self.frames += 1;
        self.worst_lag_ns = self.worst_lag_ns.max(actual_ns - theoretical_ns);
        Ok(Some(theoretical_ns + self.frame_ns))
    }

    fn on_end(&mut self, _cx: &mut ProcessContext) -> Result<(), TaskError> {
        println!(
            "renderer: {} frames, worst lag {}us",
            self.frames,
            self.worst_lag_ns / 1_000
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config {
        grace: Duration::from_secs(2),
        ..Config::default()
    };
    let scheduler = Arc::new(HardScheduler::new(cfg));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let subscribers = SubscriberSet::listen(subs, scheduler.bus().clone());

    let renderer = Process::new(
        "renderer",
        Renderer {
            frame_ns: NANOS_PER_SECOND / 20,
            frames: 0,
            worst_lag_ns: 0,
        },
        scheduler.clone(),
    );
    renderer.start()?;

    tokio::time::sleep(Duration::from_millis(300)).await;
    renderer.stop()?;
    while renderer.is_alive() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    println!(
        "renderer stopped after {} frames",
        renderer.with_logic(|r| r.frames)
    );

    scheduler.shutdown().await?;
    subscribers.shutdown().await;
    Ok(())
}
