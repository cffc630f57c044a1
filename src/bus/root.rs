//! In-process root event bus.

use crate::types::{Event, Handler, RevokeFn};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::EventBus;

/// A single handler bound to an event name.
struct Binding {
    id: u64,
    handler: Handler,
    /// Cleared on revoke so in-flight broadcasts skip it.
    active: Arc<AtomicBool>,
}

struct BusInner {
    /// Bindings per event name, in binding order.
    listeners: RwLock<HashMap<String, Vec<Binding>>>,
    /// Counter for generating binding IDs.
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, event_name: &str, id: u64) {
        let mut listeners = self.listeners.write();
        if let Some(bindings) = listeners.get_mut(event_name) {
            bindings.retain(|b| b.id != id);
            if bindings.is_empty() {
                listeners.remove(event_name);
            }
        }
    }
}

/// Global event bus shared by every scope.
///
/// Cloning is cheap; clones share the same bindings.
///
/// A broadcast snapshots the bindings for the event before invoking any of
/// them. Bindings added by a handler during a broadcast are only reached by
/// later broadcasts; bindings revoked during a broadcast are skipped if they
/// have not been invoked yet.
#[derive(Clone)]
pub struct RootBus {
    inner: Arc<BusInner>,
}

impl RootBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of handlers currently bound to `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(event_name)
            .map_or(0, |b| b.len())
    }

    /// Number of distinct event names with at least one binding.
    pub fn event_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl Default for RootBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RootBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootBus")
            .field("events", &self.event_count())
            .finish()
    }
}

impl EventBus for RootBus {
    fn bind(&self, event_name: &str, handler: Handler) -> RevokeFn {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));

        self.inner
            .listeners
            .write()
            .entry(event_name.to_string())
            .or_default()
            .push(Binding {
                id,
                handler,
                active: Arc::clone(&active),
            });

        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        let name = event_name.to_string();
        Box::new(move || {
            active.store(false, Ordering::SeqCst);
            if let Some(bus) = bus.upgrade() {
                bus.remove(&name, id);
            }
        })
    }

    fn broadcast(&self, event_name: &str, args: &[Value]) {
        let snapshot: Vec<(Handler, Arc<AtomicBool>)> = {
            let listeners = self.inner.listeners.read();
            match listeners.get(event_name) {
                Some(bindings) => bindings
                    .iter()
                    .map(|b| (Arc::clone(&b.handler), Arc::clone(&b.active)))
                    .collect(),
                None => return,
            }
        };

        tracing::trace!(event = event_name, listeners = snapshot.len(), "broadcast");

        let event = Event::new(event_name);
        for (handler, active) in snapshot {
            if active.load(Ordering::SeqCst) {
                handler(&event, args);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::handler;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Handler) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, handler(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_bind_and_broadcast() {
        let bus = RootBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _revoke = bus.bind(
            "ping",
            handler(move |event, args| s.lock().push((event.name.clone(), args.to_vec()))),
        );

        bus.broadcast("ping", &[json!("x"), json!(2)]);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "ping");
        assert_eq!(seen[0].1, vec![json!("x"), json!(2)]);
    }

    #[test]
    fn test_broadcast_other_name_not_delivered() {
        let bus = RootBus::new();
        let (count, h) = counter();
        let _revoke = bus.bind("ping", h);

        bus.broadcast("pong", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_revoke_removes_binding() {
        let bus = RootBus::new();
        let (count, h) = counter();
        let revoke = bus.bind("ping", h);
        assert_eq!(bus.listener_count("ping"), 1);

        revoke();
        assert_eq!(bus.listener_count("ping"), 0);
        assert_eq!(bus.event_count(), 0);

        bus.broadcast("ping", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_revoke_only_removes_own_binding() {
        let bus = RootBus::new();
        let (first, h1) = counter();
        let (second, h2) = counter();
        let revoke = bus.bind("ping", h1);
        let _keep = bus.bind("ping", h2);

        revoke();
        bus.broadcast("ping", &[]);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_binding_added_during_broadcast_waits_for_next() {
        let bus = RootBus::new();
        let (late, late_handler) = counter();
        let bus_clone = bus.clone();
        let pending = Mutex::new(Some(late_handler));
        let _revoke = bus.bind(
            "ping",
            handler(move |_, _| {
                if let Some(h) = pending.lock().take() {
                    // Leak the revoke; the binding lives for the test.
                    let _ = bus_clone.bind("ping", h);
                }
            }),
        );

        bus.broadcast("ping", &[]);
        assert_eq!(late.load(Ordering::SeqCst), 0);

        bus.broadcast("ping", &[]);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_binding_revoked_during_broadcast_is_skipped() {
        let bus = RootBus::new();
        let (victim, victim_handler) = counter();
        let slot: Arc<Mutex<Option<RevokeFn>>> = Arc::new(Mutex::new(None));

        let s = Arc::clone(&slot);
        let _first = bus.bind(
            "ping",
            handler(move |_, _| {
                let revoke = s.lock().take();
                if let Some(revoke) = revoke {
                    revoke();
                }
            }),
        );
        *slot.lock() = Some(bus.bind("ping", victim_handler));

        bus.broadcast("ping", &[]);
        assert_eq!(victim.load(Ordering::SeqCst), 0);
        assert_eq!(bus.listener_count("ping"), 1);
    }

    #[test]
    fn test_revoke_after_bus_dropped() {
        let bus = RootBus::new();
        let (_, h) = counter();
        let revoke = bus.bind("ping", h);
        drop(bus);

        revoke();
    }
}
