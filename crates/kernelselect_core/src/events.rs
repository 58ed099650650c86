//! Typed kernel event bus.
//!
//! # Responsibility
//! - Fan out kernel selection and session confirmation events to listeners.
//!
//! # Invariants
//! - Dispatch is synchronous on the publishing thread.
//! - A publish from inside a handler is dispatched before that handler's
//!   `publish` call returns.
//! - Handlers run against a snapshot taken at publish time; no internal lock
//!   is held while a handler runs.

use crate::kernelspec::model::KernelSpec;
use log::trace;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Kernel identity reported by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Payload of the session's kernel-created confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelCreated {
    pub kernel: KernelInfo,
}

impl KernelCreated {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kernel: KernelInfo {
                name: name.into(),
                id: None,
            },
        }
    }
}

/// Events carried by the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelEvent {
    /// A kernel switch was confirmed; carries the full spec.
    SelectionChanged(KernelSpec),
    /// The session reports which kernel the server actually started.
    KernelCreated(KernelCreated),
}

impl KernelEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SelectionChanged(_) => EventKind::SelectionChanged,
            Self::KernelCreated(_) => EventKind::KernelCreated,
        }
    }
}

/// Subscription filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SelectionChanged,
    KernelCreated,
}

impl EventKind {
    /// Stable event name used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelectionChanged => "spec_changed.Kernel",
            Self::KernelCreated => "kernel_created.Session",
        }
    }
}

/// Handle returned by `EventBus::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&KernelEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
}

/// Same-thread publish/subscribe bus for `KernelEvent`s.
#[derive(Default)]
pub struct EventBus {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&KernelEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.subscriptions).push(Subscription {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Removes a handler. Returns `false` when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = lock(&self.subscriptions);
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        subscriptions.len() != before
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.subscriptions)
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .count()
    }

    /// Publishes one event to every handler subscribed to its kind.
    ///
    /// Handlers subscribed or removed while the event is being delivered take
    /// effect from the next publish.
    pub fn publish(&self, event: KernelEvent) {
        let handlers = self.handlers_for(event.kind());
        trace!(
            "event=bus_dispatch module=events kind={} handlers={}",
            event.kind().as_str(),
            handlers.len()
        );
        for handler in handlers {
            handler(&event);
        }
    }

    fn handlers_for(&self, kind: EventKind) -> Vec<Handler> {
        lock(&self.subscriptions)
            .iter()
            .filter(|subscription| subscription.kind == kind)
            .map(|subscription| Arc::clone(&subscription.handler))
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{EventBus, EventKind, KernelCreated, KernelEvent};
    use crate::kernelspec::model::KernelSpec;
    use std::sync::{Arc, Mutex};

    fn recorder(bus: &EventBus, kind: EventKind) -> Arc<Mutex<Vec<KernelEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(kind, move |event| {
            sink.lock().expect("lock").push(event.clone());
        });
        seen
    }

    #[test]
    fn delivers_only_to_matching_kind() {
        let bus = EventBus::new();
        let changed = recorder(&bus, EventKind::SelectionChanged);
        let created = recorder(&bus, EventKind::KernelCreated);

        bus.publish(KernelEvent::KernelCreated(KernelCreated::named("python3")));

        assert!(changed.lock().expect("lock").is_empty());
        assert_eq!(created.lock().expect("lock").len(), 1);
    }

    #[test]
    fn nested_publish_is_delivered_before_outer_handler_returns() {
        let bus = Arc::new(EventBus::new());
        let order = Arc::new(Mutex::new(Vec::<String>::new()));

        let inner_bus = Arc::clone(&bus);
        let log = Arc::clone(&order);
        bus.subscribe(EventKind::KernelCreated, move |event| {
            if let KernelEvent::KernelCreated(created) = event {
                log.lock()
                    .expect("lock")
                    .push(format!("created:{}", created.kernel.name));
                inner_bus.publish(KernelEvent::SelectionChanged(KernelSpec::new(
                    created.kernel.name.clone(),
                    "Python 3",
                )));
            }
        });
        let log = Arc::clone(&order);
        bus.subscribe(EventKind::KernelCreated, move |_| {
            log.lock().expect("lock").push("created:second".to_string());
        });
        let log = Arc::clone(&order);
        bus.subscribe(EventKind::SelectionChanged, move |event| {
            if let KernelEvent::SelectionChanged(spec) = event {
                log.lock().expect("lock").push(format!("changed:{}", spec.name));
            }
        });

        bus.publish(KernelEvent::KernelCreated(KernelCreated::named("python3")));

        assert_eq!(
            *order.lock().expect("lock"),
            vec!["created:python3", "changed:python3", "created:second"]
        );
    }

    #[test]
    fn handler_subscribed_during_dispatch_waits_for_next_publish() {
        let bus = Arc::new(EventBus::new());
        let late = Arc::new(Mutex::new(0_usize));

        let inner_bus = Arc::clone(&bus);
        let counter = Arc::clone(&late);
        bus.subscribe(EventKind::KernelCreated, move |_| {
            let counter = Arc::clone(&counter);
            inner_bus.subscribe(EventKind::SelectionChanged, move |_| {
                *counter.lock().expect("lock") += 1;
            });
        });

        bus.publish(KernelEvent::KernelCreated(KernelCreated::named("python3")));
        assert_eq!(*late.lock().expect("lock"), 0);

        bus.publish(KernelEvent::SelectionChanged(KernelSpec::new("python3", "Python 3")));
        assert_eq!(*late.lock().expect("lock"), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&seen);
        let id = bus.subscribe(EventKind::SelectionChanged, move |_| {
            *sink.lock().expect("lock") += 1;
        });

        bus.publish(KernelEvent::SelectionChanged(KernelSpec::new("a", "A")));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(KernelEvent::SelectionChanged(KernelSpec::new("a", "A")));

        assert_eq!(*seen.lock().expect("lock"), 1);
        assert_eq!(bus.subscriber_count(EventKind::SelectionChanged), 0);
    }

    #[test]
    fn kernel_created_payload_matches_session_wire_shape() {
        let created: KernelCreated =
            serde_json::from_str(r#"{"kernel": {"name": "python3", "id": "abc"}}"#)
                .expect("valid payload");
        assert_eq!(created.kernel.name, "python3");
        assert_eq!(created.kernel.id.as_deref(), Some("abc"));
    }
}
