//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many sources (tasks, processes, schedulers).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                   Consumers:
//!   RepeatableRunnable ──┐
//!   Process            ──┼──► Bus ───► SubscriberSet::listen ──► subscribers
//!   Soft/HardScheduler ──┘  (broadcast)  or a test receiver
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and needs no async runtime.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::TaskBegin));
    }

    #[test]
    fn test_receiver_sees_only_later_events() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::TaskBegin).with_task("early"));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::TaskDone).with_task("late"));

        let ev = rx.try_recv().expect("one event");
        assert_eq!(ev.kind, EventKind::TaskDone);
        assert_eq!(ev.task.as_deref(), Some("late"));
        assert!(rx.try_recv().is_err());
    }
}
