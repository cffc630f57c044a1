//! Subscription record types.

use crate::types::{RevokeFn, DESTROY_EVENT};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a mediator.
#[derive(Clone, Debug)]
pub struct MediatorConfig {
    /// Event name that is redirected to a destroy callback instead of being
    /// tracked as a subscription.
    /// Default: "$destroy"
    pub destroy_event: String,

    /// Capacity reserved for a scope's record sequence on first subscribe.
    /// Default: 4
    pub initial_scope_capacity: usize,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            destroy_event: DESTROY_EVENT.to_string(),
            initial_scope_capacity: 4,
        }
    }
}

/// Single-use capability that detaches one handler from the bus.
///
/// The bus revoke function is held until the first call takes it, so the
/// bus is reached at most once however many clones are invoked. A
/// subscription is live exactly while its deregistration still holds the
/// function.
#[derive(Clone)]
pub struct Deregistration {
    revoke: Arc<Mutex<Option<RevokeFn>>>,
}

impl Deregistration {
    pub(crate) fn new(revoke: RevokeFn) -> Self {
        Self {
            revoke: Arc::new(Mutex::new(Some(revoke))),
        }
    }

    /// Detach the handler. Returns false if it was already detached.
    pub fn revoke(&self) -> bool {
        // Take under the lock, call outside it: revoking may reenter.
        let revoke = self.revoke.lock().take();
        match revoke {
            Some(revoke) => {
                revoke();
                true
            }
            None => false,
        }
    }

    /// Whether the handler is still attached.
    pub fn is_live(&self) -> bool {
        self.revoke.lock().is_some()
    }

    /// Whether both values are the same capability.
    pub fn ptr_eq(&self, other: &Deregistration) -> bool {
        Arc::ptr_eq(&self.revoke, &other.revoke)
    }
}

impl PartialEq for Deregistration {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Deregistration {}

impl fmt::Debug for Deregistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deregistration")
            .field("live", &self.is_live())
            .finish()
    }
}

/// One binding between an event name and a handler, owned by a scope.
#[derive(Clone, Debug)]
pub struct SubscriptionRecord {
    event_name: String,
    deregistration: Deregistration,
}

impl SubscriptionRecord {
    pub(crate) fn new(event_name: &str, revoke: RevokeFn) -> Self {
        Self {
            event_name: event_name.to_string(),
            deregistration: Deregistration::new(revoke),
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn is_live(&self) -> bool {
        self.deregistration.is_live()
    }

    pub fn deregistration(&self) -> &Deregistration {
        &self.deregistration
    }

    pub(crate) fn summary(&self) -> SubscriptionSummary {
        SubscriptionSummary {
            event_name: self.event_name.clone(),
            live: self.is_live(),
        }
    }
}

/// Serializable view of a record (for diagnostics).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub event_name: String,
    pub live: bool,
}
