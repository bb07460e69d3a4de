//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`] distributing events to multiple subscribers concurrently
//! without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! Bus ──► listener ──► emit(event)
//!                        │
//!                        ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!                        │    (bounded)         └──────► panic → SubscriberPanicked
//!                        ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!                        │    (bounded)
//!                        └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!                             (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: slow/panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//! - **Lag**: a listener that falls behind the bus skips the overwritten events
//!
//! ## Panic handling
//! Worker tasks use `catch_unwind`: a panic becomes a `SubscriberPanicked` event and the
//! worker continues with the next event.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Sends one event to every channel, reporting drops on the bus.
fn fan_out(channels: &[SubscriberChannel], bus: &Bus, event: Arc<Event>) {
    let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

    for channel in channels {
        match channel.sender.try_send(Arc::clone(&event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                if !is_overflow_evt {
                    bus.publish(Event::subscriber_overflow(channel.name, "full"));
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                if !is_overflow_evt {
                    bus.publish(Event::subscriber_overflow(channel.name, "closed"));
                }
            }
        }
    }
}

/// Fan-out coordinator for multiple event subscribers.
///
/// Manages per-subscriber queues and worker tasks, providing:
/// - **Concurrent delivery**: events sent to all subscribers simultaneously
/// - **Isolation**: each subscriber has dedicated queue and worker
/// - **Panic safety**: panics caught and reported, don't crash the scheduler
/// - **Overflow handling**: dropped events reported via `SubscriberOverflow`
pub struct SubscriberSet {
    channels: Arc<[SubscriberChannel]>,
    workers: Vec<JoinHandle<()>>,
    listener: Option<(CancellationToken, JoinHandle<()>)>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Events reach the workers through [`emit`](Self::emit) only; see
    /// [`listen`](Self::listen) for a set fed by the bus.
    ///
    /// Must be called within a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(&sub);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = s.on_event(ev.as_ref());

                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        let info = panic_message(panic_err.as_ref());
                        bus_for_worker.publish(Event::subscriber_panicked(s.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels: channels.into(),
            workers,
            listener: None,
            bus,
        }
    }

    /// Creates a set that forwards every event published on `bus` to `subs`.
    ///
    /// The listener subscribes before this returns, so no later event is missed.
    #[must_use]
    pub fn listen(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut set = Self::new(subs, bus);
        let token = CancellationToken::new();
        let rx = set.bus.subscribe();
        let handle = tokio::spawn(Self::forward(
            rx,
            Arc::clone(&set.channels),
            set.bus.clone(),
            token.clone(),
        ));
        set.listener = Some((token, handle));
        set
    }

    async fn forward(
        mut rx: broadcast::Receiver<Event>,
        channels: Arc<[SubscriberChannel]>,
        bus: Bus,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                res = rx.recv() => match res {
                    Ok(ev) => fan_out(&channels, &bus, Arc::new(ev)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
        // Deliver what was published before shutdown.
        loop {
            match rx.try_recv() {
                Ok(ev) => fan_out(&channels, &bus, Arc::new(ev)),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }

    /// Emits an event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// - Uses `try_send` (non-blocking)
    /// - On queue full: drops event, publishes `SubscriberOverflow` with reason "full"
    /// - On queue closed: publishes `SubscriberOverflow` with reason "closed"
    ///
    /// `SubscriberOverflow` events that overflow themselves are not re-published.
    pub fn emit_arc(&self, event: Arc<Event>) {
        fan_out(&self.channels, &self.bus, event);
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Gracefully shuts down the listener and all subscriber workers.
    ///
    /// 1. Stops the listener after it forwarded the events already on the bus
    /// 2. Drops all channel senders (workers see channel closed)
    /// 3. Awaits all worker tasks to finish
    pub async fn shutdown(self) {
        if let Some((token, handle)) = self.listener {
            token.cancel();
            let _ = handle.await;
        }
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}
