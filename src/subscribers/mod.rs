//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and the
//! built-in [`LogWriter`] (feature `logging`) for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! RepeatableRunnable / Process / Scheduler ── publish(Event) ──► Bus
//!                                                                 │
//!                                            SubscriberSet::listen (forwarder)
//!                                                                 │
//!                                                  ┌──────────────┼──────────────┐
//!                                                  ▼              ▼              ▼
//!                                              LogWriter       Metrics        Custom
//! ```
//!
//! Subscribers never run on the scheduler's threads: a slow subscriber delays only itself.

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
