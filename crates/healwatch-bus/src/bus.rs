//! Event bus implementation.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use healwatch_types::{BusEvent, EventType};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::error::BusResult;

/// Number of events retained for replay.
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;

/// Channel capacity for async stream consumers
const STREAM_CHANNEL_CAPACITY: usize = 1024;

/// Synchronous subscriber invoked for every publication.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &BusEvent) -> BusResult<()>;
}

impl<F> EventHandler for F
where
    F: Fn(&BusEvent) -> BusResult<()> + Send + Sync,
{
    fn handle(&self, event: &BusEvent) -> BusResult<()> {
        self(event)
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// Publish/subscribe channel with a bounded replay history.
pub struct EventBus {
    capacity: usize,
    history: Mutex<VecDeque<BusEvent>>,
    subscribers: RwLock<Vec<(SubscriptionId, Arc<dyn EventHandler>)>>,
    next_subscription: AtomicU64,
    stream_tx: broadcast::Sender<BusEvent>,
}

impl EventBus {
    /// Create a bus retaining [`DEFAULT_HISTORY_CAPACITY`] events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Create a bus retaining at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (stream_tx, _) = broadcast::channel(STREAM_CHANNEL_CAPACITY);
        Self {
            capacity: capacity.max(1),
            history: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            stream_tx,
        }
    }

    /// Publish an event and notify every subscriber before returning.
    pub fn publish(&self, event_type: EventType, data: serde_json::Value) -> BusEvent {
        let event = BusEvent::new(event_type, data);

        {
            let mut history = self.history.lock();
            history.push_back(event.clone());
            while history.len() > self.capacity {
                history.pop_front();
            }
        }

        // Snapshot the handler list so handlers may (un)subscribe or publish.
        let handlers: Vec<_> = self
            .subscribers
            .read()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(
                        subscription = %id,
                        event_type = %event.event_type,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(_) => {
                    warn!(
                        subscription = %id,
                        event_type = %event.event_type,
                        "Event handler panicked"
                    );
                }
            }
        }

        // No stream receivers is fine
        let _ = self.stream_tx.send(event.clone());

        trace!(event_type = %event.event_type, "Published event");
        event
    }

    /// Register a closure for every future publication.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&BusEvent) -> BusResult<()> + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    /// Register a handler object for every future publication.
    pub fn subscribe_handler(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, handler));
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    /// Receiver for async consumers. Only sees events published after the call.
    pub fn stream(&self) -> broadcast::Receiver<BusEvent> {
        self.stream_tx.subscribe()
    }

    /// The most recent `limit` events, oldest first.
    pub fn history(&self, limit: usize) -> Vec<BusEvent> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// The most recent `limit` events of one type, oldest first.
    pub fn history_by_type(&self, event_type: EventType, limit: usize) -> Vec<BusEvent> {
        let history = self.history.lock();
        let mut matching: Vec<BusEvent> = history
            .iter()
            .rev()
            .filter(|e| e.event_type == event_type)
            .take(limit)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of registered synchronous handlers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
