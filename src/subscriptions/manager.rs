//! Scope-aware subscription registry.

use crate::bus::EventBus;
use crate::error::{MediatorError, Result};
use crate::scope::Scope;
use crate::types::{DestroyEvent, Event, Handler, ScopeKey};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::types::{Deregistration, MediatorConfig, SubscriptionRecord, SubscriptionSummary};

/// Shared registry state. The destroy hook holds a weak reference to it.
struct Inner<B, K> {
    bus: B,
    config: MediatorConfig,
    /// Records per scope, in subscription order. A key is created on the
    /// first tracked subscribe and never removed.
    subscribers: Mutex<HashMap<K, Vec<SubscriptionRecord>>>,
}

impl<B: EventBus, K: ScopeKey> Inner<B, K> {
    /// Revoke every record for `scope_id` matching `filter`, then compact.
    ///
    /// Deregistrations are collected first so no lock is held while the bus
    /// runs revoke functions.
    fn revoke_where<F>(&self, scope_id: &K, filter: F) -> usize
    where
        F: Fn(&SubscriptionRecord) -> bool,
    {
        let targets: Vec<Deregistration> = {
            let subs = self.subscribers.lock();
            match subs.get(scope_id) {
                Some(records) => records
                    .iter()
                    .filter(|r| filter(r))
                    .map(|r| r.deregistration().clone())
                    .collect(),
                None => return 0,
            }
        };

        let revoked = targets.iter().filter(|d| d.revoke()).count();
        self.remove_null_events(scope_id);
        revoked
    }

    fn unsubscribe(&self, scope_id: &K, event_name: &str) {
        let revoked = self.revoke_where(scope_id, |r| r.event_name() == event_name);
        tracing::trace!(scope = ?scope_id, event = event_name, revoked, "unsubscribe");
    }

    fn unsubscribe_all(&self, scope_id: &K) {
        let revoked = self.revoke_where(scope_id, |_| true);
        tracing::trace!(scope = ?scope_id, revoked, "unsubscribe all");
    }

    fn remove_null_events(&self, scope_id: &K) {
        if let Some(records) = self.subscribers.lock().get_mut(scope_id) {
            records.retain(|r| r.is_live());
        }
    }

    /// Automatic cleanup bound to each tracked scope's destruction.
    fn scope_destroy(&self, destroyed: &DestroyEvent<K>) {
        tracing::debug!(scope = ?destroyed.scope, "scope destroyed, revoking subscriptions");
        self.unsubscribe_all(&destroyed.scope);
    }
}

/// Mediates subscriptions between scopes over a shared event bus.
///
/// Every tracked subscription belongs to a scope and is revoked when that
/// scope is destroyed, whether or not its owner unsubscribed. Cloning is
/// cheap; clones share one registry.
pub struct Mediator<B, K> {
    inner: Arc<Inner<B, K>>,
}

impl<B, K> Clone for Mediator<B, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: EventBus, K: ScopeKey> Mediator<B, K> {
    /// Create a mediator over `bus` with the default configuration.
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, MediatorConfig::default())
    }

    /// Create a mediator with a custom configuration.
    pub fn with_config(bus: B, config: MediatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                config,
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The bus handlers are bound on.
    pub fn bus(&self) -> &B {
        &self.inner.bus
    }

    /// Configuration this mediator was built with.
    pub fn config(&self) -> &MediatorConfig {
        &self.inner.config
    }

    /// Subscribe `handler` to `event_name` on behalf of `scope`.
    ///
    /// Subscribing to the destroy event registers a plain destroy callback
    /// instead (see [`Mediator::on_destroy`]); the handler then runs once
    /// with no arguments and nothing is tracked.
    ///
    /// The first tracked subscription for a scope also hooks its destruction
    /// so every subscription it holds is revoked automatically.
    ///
    /// Fails with [`MediatorError::ScopeDestroyed`] if the scope is already
    /// gone, for tracked subscriptions and destroy callbacks alike: neither
    /// would ever run or be cleaned up.
    pub fn subscribe<S>(&self, scope: &S, event_name: &str, handler: Handler) -> Result<()>
    where
        S: Scope<Id = K>,
    {
        let scope_id = scope.id();
        if scope.is_destroyed() {
            return Err(MediatorError::scope_destroyed(&scope_id));
        }

        if event_name == self.inner.config.destroy_event {
            let event = Event::new(event_name);
            self.on_destroy(scope, move |_| handler(&event, &[]));
            return Ok(());
        }

        let first = {
            let mut subs = self.inner.subscribers.lock();
            if subs.contains_key(&scope_id) {
                false
            } else {
                subs.insert(
                    scope_id.clone(),
                    Vec::with_capacity(self.inner.config.initial_scope_capacity),
                );
                true
            }
        };

        if first {
            tracing::debug!(scope = ?scope_id, "tracking new scope");
            let weak = Arc::downgrade(&self.inner);
            scope.on_destroy(Box::new(move |destroyed: &DestroyEvent<K>| {
                if let Some(inner) = weak.upgrade() {
                    inner.scope_destroy(destroyed);
                }
            }));
        }

        let revoke = self.inner.bus.bind(event_name, handler);
        self.inner
            .subscribers
            .lock()
            .entry(scope_id)
            .or_default()
            .push(SubscriptionRecord::new(event_name, revoke));

        Ok(())
    }

    /// Broadcast `event_name` with `args` to every bound handler.
    pub fn emit(&self, event_name: &str, args: &[Value]) {
        self.inner.bus.broadcast(event_name, args);
    }

    /// Revoke every subscription `scope` holds for `event_name`.
    ///
    /// Does nothing for a scope that never subscribed.
    pub fn unsubscribe<S>(&self, scope: &S, event_name: &str)
    where
        S: Scope<Id = K>,
    {
        self.inner.unsubscribe(&scope.id(), event_name);
    }

    /// Revoke every subscription `scope` holds.
    ///
    /// Does nothing for a scope that never subscribed.
    pub fn unsubscribe_all_for_scope<S>(&self, scope: &S)
    where
        S: Scope<Id = K>,
    {
        self.inner.unsubscribe_all(&scope.id());
    }

    /// Run `destroy_fn` when `scope` is destroyed. Not tracked, not deduplicated.
    pub fn on_destroy<S, F>(&self, scope: &S, destroy_fn: F)
    where
        S: Scope<Id = K>,
        F: FnOnce(&DestroyEvent<K>) + Send + 'static,
    {
        scope.on_destroy(Box::new(destroy_fn));
    }

    /// Drop records that are no longer live from a scope's sequence.
    ///
    /// Every unsubscribe path already compacts; this is only needed after
    /// revoking through a [`Deregistration`] directly.
    ///
    /// Keyed by identity rather than by scope so it can run after the scope
    /// itself has been dropped.
    pub fn remove_null_events(&self, scope_id: &K) {
        self.inner.remove_null_events(scope_id);
    }

    /// Deregistration of the first record for `event_name` held by `scope`.
    pub fn get_event_deregistrator<S>(&self, scope: &S, event_name: &str) -> Result<Deregistration>
    where
        S: Scope<Id = K>,
    {
        let scope_id = scope.id();
        let found = self
            .inner
            .subscribers
            .lock()
            .get(&scope_id)
            .and_then(|records| records.iter().find(|r| r.event_name() == event_name))
            .map(|r| r.deregistration().clone());
        found.ok_or_else(|| MediatorError::not_found(&scope_id, event_name))
    }

    // --- Diagnostics ---
    //
    // Keyed by scope identity: inspecting a scope must not require holding it.

    /// Snapshot of every scope's records.
    ///
    /// Records carry their live [`Deregistration`]; revoking through a
    /// snapshot detaches the real binding. Use [`Mediator::summaries`] for an
    /// inert view.
    pub fn subscribers(&self) -> HashMap<K, Vec<SubscriptionRecord>> {
        self.inner.subscribers.lock().clone()
    }

    /// Snapshot of one scope's records, `None` if it never subscribed.
    ///
    /// Same caveat as [`Mediator::subscribers`]: the deregistrations are live.
    pub fn records(&self, scope_id: &K) -> Option<Vec<SubscriptionRecord>> {
        self.inner.subscribers.lock().get(scope_id).cloned()
    }

    /// Whether the scope has ever made a tracked subscription.
    pub fn contains_scope(&self, scope_id: &K) -> bool {
        self.inner.subscribers.lock().contains_key(scope_id)
    }

    /// Number of scopes that have ever subscribed.
    pub fn scope_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Records held for a scope, live or not.
    pub fn subscription_count(&self, scope_id: &K) -> usize {
        self.inner
            .subscribers
            .lock()
            .get(scope_id)
            .map_or(0, |r| r.len())
    }

    /// Records for a scope that are still bound on the bus.
    pub fn live_count(&self, scope_id: &K) -> usize {
        self.inner
            .subscribers
            .lock()
            .get(scope_id)
            .map_or(0, |r| r.iter().filter(|r| r.is_live()).count())
    }

    /// Inert, serializable view of a scope's records.
    pub fn summaries(&self, scope_id: &K) -> Vec<SubscriptionSummary> {
        self.inner
            .subscribers
            .lock()
            .get(scope_id)
            .map(|r| r.iter().map(SubscriptionRecord::summary).collect())
            .unwrap_or_default()
    }
}

impl<B: fmt::Debug, K> fmt::Debug for Mediator<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mediator")
            .field("bus", &self.inner.bus)
            .field("config", &self.inner.config)
            .field("scopes", &self.inner.subscribers.lock().len())
            .finish()
    }
}
