//! # healwatch bus
//!
//! In-process publish/subscribe channel with a bounded, time-ordered event log.
//!
//! Publication is synchronous: [`EventBus::publish`] appends to the history and
//! runs every registered [`EventHandler`] in subscription order before it
//! returns. A handler that errors or panics is logged and skipped; it never
//! prevents the event from reaching the remaining handlers.
//!
//! Async consumers (e.g. an SSE endpoint) can take a broadcast receiver via
//! [`EventBus::stream`] and replay missed events from [`EventBus::history`].

mod bus;
mod error;

pub use bus::{EventBus, EventHandler, SubscriptionId, DEFAULT_HISTORY_CAPACITY};
pub use error::{BusError, BusResult};
