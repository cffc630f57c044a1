//! Core types shared by the bus, the scope tree and the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Default name of the reserved destruction event.
pub const DESTROY_EVENT: &str = "$destroy";

/// Context passed to every handler as its first argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Name the event was emitted under.
    pub name: String,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A handler bound to an event name.
///
/// Handlers are shared because a broadcast snapshots them before invoking.
pub type Handler = Arc<dyn Fn(&Event, &[Value]) + Send + Sync>;

/// Detaches one binding from the bus. Consumed on use.
pub type RevokeFn = Box<dyn FnOnce() + Send>;

/// Callback run when a scope is destroyed.
pub type DestroyCallback<K> = Box<dyn FnOnce(&DestroyEvent<K>) + Send>;

/// Notification handed to destroy callbacks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestroyEvent<K> {
    /// The scope being destroyed.
    pub scope: K,
}

/// Bounds a scope identity has to satisfy to be used as a registry key.
pub trait ScopeKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> ScopeKey for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Identity of a scope in the in-process [`ScopeTree`](crate::ScopeTree).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u64);

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrap a closure into a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event, &[Value]) + Send + Sync + 'static,
{
    Arc::new(f)
}
