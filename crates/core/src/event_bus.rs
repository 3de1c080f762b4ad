//! Per-project event bus.
//!
//! A fixed-capacity ring buffer of [`Event`]s with synchronous fan-out to
//! registered callbacks. The bus is lossy by construction: once the buffer is
//! full the oldest event is dropped, and nothing is persisted. Use an
//! [`AuditSink`](crate::audit::AuditSink) when history must survive.

use serde_json::{Map, Value};
use sl_protocol::event_models::{Event, BROADCAST};
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Default ring buffer size.
pub const DEFAULT_CAPACITY: usize = 100;

/// Callback invoked for every event delivered to a subscription key.
///
/// Returned errors are logged and otherwise ignored.
pub type Subscriber = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

/// In-memory pub/sub channel scoped to one project.
///
/// Buffer and subscriber table sit behind separate locks so publishers on
/// several threads are safe. Callbacks run after both locks are released,
/// which lets a callback publish or subscribe on the same bus.
pub struct EventBus {
    project_name: String,
    capacity: usize,
    buffer: Mutex<VecDeque<Event>>,
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    observers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self::with_capacity(project_name, DEFAULT_CAPACITY)
    }

    /// Create a bus holding at most `capacity` events (minimum 1).
    pub fn with_capacity(project_name: impl Into<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            project_name: project_name.into(),
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            subscribers: Mutex::new(HashMap::new()),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().is_empty()
    }

    /// Publish an event and notify subscribers.
    ///
    /// Callbacks registered for `recipient` run first, in registration
    /// order. When `recipient` is `"ALL"` the `"ALL"` callbacks then run a
    /// second time as the broadcast pass. Observers run last, once per
    /// event. A failing or panicking callback is logged and skipped.
    pub fn publish(
        &self,
        sender: &str,
        recipient: &str,
        event_type: &str,
        payload: Map<String, Value>,
    ) -> Event {
        let event = Event::new(&self.project_name, sender, recipient, event_type, payload);

        {
            let mut buffer = self.buffer();
            if buffer.len() == self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(event.clone());
        }

        debug!(
            project = %self.project_name,
            sender,
            recipient,
            event_type,
            "Published event"
        );

        for callback in self.callbacks_for(recipient) {
            self.notify(&callback, &event);
        }

        event
    }

    fn notify(&self, callback: &Subscriber, event: &Event) {
        match catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(project = %self.project_name, event_type = %event.event_type, "Error in subscriber callback: {e:#}");
            }
            Err(_) => {
                warn!(project = %self.project_name, event_type = %event.event_type, "Subscriber callback panicked");
            }
        }
    }

    /// Register a callback for an agent name or `"ALL"`.
    pub fn subscribe<F>(&self, agent_name: &str, callback: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers()
            .entry(agent_name.to_string())
            .or_default()
            .push(Arc::new(callback));
    }

    /// Register a callback that sees every published event exactly once,
    /// whatever its recipient.
    pub fn observe<F>(&self, callback: F)
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.observers().push(Arc::new(callback));
    }

    /// Up to `limit` most recent events addressed to `agent_name` or `"ALL"`,
    /// newest first.
    pub fn get_recent(&self, agent_name: &str, limit: usize) -> Vec<Event> {
        self.buffer()
            .iter()
            .rev()
            .filter(|event| event.is_for(agent_name))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Drop every buffered event. Subscriptions are kept.
    pub fn clear(&self) {
        self.buffer().clear();
    }

    /// Snapshot of the callbacks to run for `recipient`, in call order.
    fn callbacks_for(&self, recipient: &str) -> Vec<Subscriber> {
        let mut callbacks = Vec::new();
        {
            let subscribers = self.subscribers();
            if let Some(direct) = subscribers.get(recipient) {
                callbacks.extend(direct.iter().cloned());
            }
            if recipient == BROADCAST {
                if let Some(broadcast) = subscribers.get(BROADCAST) {
                    callbacks.extend(broadcast.iter().cloned());
                }
            }
        }
        callbacks.extend(self.observers().iter().cloned());
        callbacks
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<Event>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build an event payload from key/value pairs.
pub fn payload<I, K>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn publish_n(bus: &EventBus, recipient: &str, n: usize) {
        for i in 0..n {
            bus.publish("tester", recipient, "tick", payload([("i", json!(i))]));
        }
    }

    #[test]
    fn test_publish_returns_event() {
        let bus = EventBus::new("noir");
        let event = bus.publish("user", "editor", "feedback", Map::new());

        assert_eq!(event.project_name, "noir");
        assert_eq!(event.sender, "user");
        assert_eq!(event.recipient, "editor");
        assert_eq!(event.event_type, "feedback");
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let bus = EventBus::with_capacity("noir", 5);
        publish_n(&bus, BROADCAST, 8);

        assert_eq!(bus.len(), 5);
        let recent = bus.get_recent("editor", 5);
        let order: Vec<i64> = recent
            .iter()
            .map(|e| e.payload["i"].as_i64().unwrap_or(-1))
            .collect();
        assert_eq!(order, vec![7, 6, 5, 4, 3]);
    }

    #[test]
    fn test_get_recent_filters_by_recipient() {
        let bus = EventBus::new("noir");
        bus.publish("a", "editor", "x", Map::new());
        bus.publish("a", "worldbuilder", "x", Map::new());
        bus.publish("a", BROADCAST, "x", Map::new());

        let recent = bus.get_recent("editor", 10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].recipient, BROADCAST);
        assert_eq!(recent[1].recipient, "editor");

        assert_eq!(bus.get_recent("editor", 1).len(), 1);
        assert!(bus.get_recent("editor", 0).is_empty());
    }

    #[test]
    fn test_subscribers_called_in_order() {
        let bus = EventBus::new("noir");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe("editor", move |_| {
                seen.lock().unwrap().push(tag);
                Ok(())
            });
        }

        bus.publish("user", "editor", "feedback", Map::new());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Event) -> anyhow::Result<()> + Send + Sync) {
        let hits = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&hits);
        (hits, move |_: &Event| {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_broadcast_runs_all_callbacks_twice() {
        let bus = EventBus::new("noir");
        let (all_hits, on_all) = counter();
        let (editor_hits, on_editor) = counter();
        bus.subscribe(BROADCAST, on_all);
        bus.subscribe("editor", on_editor);

        bus.publish("user", "editor", "feedback", Map::new());
        assert_eq!(all_hits.load(Ordering::SeqCst), 0);
        assert_eq!(editor_hits.load(Ordering::SeqCst), 1);

        bus.publish("system", BROADCAST, "status", Map::new());
        assert_eq!(all_hits.load(Ordering::SeqCst), 2);
        assert_eq!(editor_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_sees_each_event_once() {
        let bus = EventBus::new("noir");
        let (hits, on_event) = counter();
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);
        bus.observe(on_event);
        bus.observe(move |_| {
            seen.lock().unwrap().push("observer");
            Ok(())
        });
        let seen = Arc::clone(&order);
        bus.subscribe("editor", move |_| {
            seen.lock().unwrap().push("editor");
            Ok(())
        });

        bus.publish("system", BROADCAST, "status", Map::new());
        bus.publish("user", "editor", "feedback", Map::new());

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(*order.lock().unwrap(), vec!["observer", "editor", "observer"]);
    }

    #[test]
    fn test_failing_subscriber_is_isolated() {
        let bus = EventBus::new("noir");
        let hits = Arc::new(AtomicUsize::new(0));

        bus.subscribe("editor", |_| anyhow::bail!("subscriber exploded"));
        bus.subscribe("editor", |_| panic!("subscriber panicked"));
        let counter = Arc::clone(&hits);
        bus.subscribe("editor", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish("user", "editor", "feedback", Map::new());
        bus.publish("user", "editor", "feedback", Map::new());

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(bus.len(), 2);
    }

    #[test]
    fn test_callback_can_publish() {
        let bus = Arc::new(EventBus::new("noir"));
        let inner = Arc::clone(&bus);
        bus.subscribe("editor", move |event| {
            if event.event_type == "feedback" {
                inner.publish("editor", "user", "ack", Map::new());
            }
            Ok(())
        });

        bus.publish("user", "editor", "feedback", Map::new());
        assert_eq!(bus.get_recent("user", 10).len(), 1);
    }

    #[test]
    fn test_clear() {
        let bus = EventBus::new("noir");
        publish_n(&bus, "editor", 3);
        bus.clear();
        assert!(bus.is_empty());
        assert!(bus.get_recent("editor", 10).is_empty());
    }

    #[test]
    fn test_concurrent_publishers() {
        let bus = Arc::new(EventBus::with_capacity("noir", 1000));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let bus = Arc::clone(&bus);
                std::thread::spawn(move || publish_n(&bus, BROADCAST, 100))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(bus.len(), 400);
    }
}
