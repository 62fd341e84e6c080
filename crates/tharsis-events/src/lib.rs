//! Synchronous in-process event bus.
//!
//! Handlers are registered under string topics and run on the publisher's
//! thread, in subscription order, before [`EventBus::publish`] returns.
//! Each handler is isolated: an error or a panic is logged, recorded in the
//! [`PublishReport`], and delivery moves on to the next subscriber.
//!
//! The subscription table lock is never held while a handler runs, so a
//! handler may publish, subscribe, or unsubscribe without deadlocking. A
//! nested publish sees the table as it is at that moment.
//!
//! ```rust
//! use tharsis_events::EventBus;
//!
//! let bus = EventBus::new();
//! let sub = bus.subscribe("boardUpdated", |payload| {
//!     println!("board changed: {payload}");
//!     Ok(())
//! });
//! bus.publish("boardUpdated", &serde_json::json!({ "user": "Ivan" }));
//! sub.unsubscribe();
//! ```

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, warn};

/// Errors a handler can report back to the bus.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The handler ran and failed.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler's consumer has gone away.
    #[error("subscriber disconnected")]
    Disconnected,

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Wrap any displayable error as [`HandlerError::Failed`].
    pub fn failed(error: impl core::fmt::Display) -> Self {
        Self::Failed(error.to_string())
    }
}

/// Identifier of one subscription. Never reused within a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered event handler.
pub type Handler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

/// A handler that failed during a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// The failing subscription.
    pub id: SubscriptionId,
    /// What went wrong.
    pub error: HandlerError,
}

/// Outcome of a single [`EventBus::publish`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Handlers that ran to completion.
    pub delivered: usize,
    /// Handlers that errored or panicked.
    pub failures: Vec<DeliveryFailure>,
}

impl PublishReport {
    /// Whether every invoked handler succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
struct Table {
    next_id: u64,
    topics: BTreeMap<String, BTreeMap<SubscriptionId, Handler>>,
}

fn lock(table: &Mutex<Table>) -> MutexGuard<'_, Table> {
    // Handlers never run under this lock, so a poisoned table is still
    // consistent.
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process publish/subscribe dispatcher.
#[derive(Default)]
pub struct EventBus {
    table: Arc<Mutex<Table>>,
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let table = lock(&self.table);
        f.debug_struct("EventBus")
            .field("topics", &table.topics.len())
            .field("next_id", &table.next_id)
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `topic`.
    ///
    /// The handler stays registered until [`Subscription::unsubscribe`] is
    /// called or the bus is dropped. Dropping the [`Subscription`] handle
    /// does not unsubscribe.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut table = lock(&self.table);
        table.next_id = table.next_id.saturating_add(1);
        let id = SubscriptionId(table.next_id);
        table
            .topics
            .entry(topic.to_owned())
            .or_default()
            .insert(id, Arc::new(handler));
        drop(table);

        debug!(topic, %id, "subscribed");
        Subscription {
            topic: topic.to_owned(),
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Deliver `payload` to every handler currently subscribed to `topic`.
    ///
    /// Handlers run synchronously in subscription order. The set of
    /// recipients is fixed when the call starts, except that a handler
    /// unsubscribed by an earlier handler in the same call is skipped.
    /// Publishing to a topic without subscribers does nothing.
    pub fn publish(&self, topic: &str, payload: &Value) -> PublishReport {
        let ids: Vec<SubscriptionId> = lock(&self.table)
            .topics
            .get(topic)
            .map(|bucket| bucket.keys().copied().collect())
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for id in ids {
            let handler = lock(&self.table)
                .topics
                .get(topic)
                .and_then(|bucket| bucket.get(&id))
                .cloned();
            let Some(handler) = handler else {
                continue;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(payload)))
                .unwrap_or_else(|cause| Err(HandlerError::Panicked(panic_message(&*cause))));

            match outcome {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(error) => {
                    warn!(topic, %id, %error, "event handler failed, continuing delivery");
                    report.failures.push(DeliveryFailure { id, error });
                }
            }
        }
        report
    }

    /// Serialize `event` and publish it under `topic`.
    ///
    /// A payload that cannot be serialized is logged and nothing is
    /// delivered.
    pub fn publish_event<T: serde::Serialize + ?Sized>(&self, topic: &str, event: &T) -> PublishReport {
        match serde_json::to_value(event) {
            Ok(payload) => self.publish(topic, &payload),
            Err(error) => {
                warn!(topic, %error, "event payload could not be serialized");
                PublishReport::default()
            }
        }
    }

    /// Number of live subscriptions under `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        lock(&self.table).topics.get(topic).map_or(0, BTreeMap::len)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        lock(&self.table).topics.len()
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = cause.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = cause.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// Handle to one registered handler.
#[must_use = "a subscription can only be removed through its handle"]
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    id: SubscriptionId,
    table: Weak<Mutex<Table>>,
}

impl Subscription {
    /// The subscription's id.
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove exactly this handler, dropping the topic when it was the last
    /// one.
    ///
    /// Returns `false` if the handler was already removed or the bus is
    /// gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(table) = self.table.upgrade() else {
            return false;
        };
        let mut table = lock(&table);
        let Some(bucket) = table.topics.get_mut(&self.topic) else {
            return false;
        };
        let removed = bucket.remove(&self.id).is_some();
        if bucket.is_empty() {
            table.topics.remove(&self.topic);
        }
        drop(table);

        if removed {
            debug!(topic = %self.topic, id = %self.id, "unsubscribed");
        }
        removed
    }
}
