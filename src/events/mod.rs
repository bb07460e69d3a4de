//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by tasks, processes and schedulers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `RepeatableRunnable` (hook lifecycle), `Process` (start/stop),
//!   `SoftScheduler`/`HardScheduler` (failed runs, shutdown), `SubscriberSet` workers.
//! - **Consumers**: `SubscriberSet::listen` fans bus events out to user subscribers;
//!   tests may `subscribe()` directly and drain with `try_recv`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
