//! Scope-owned subscriptions over a shared event bus.
//!
//! The [`Mediator`] keeps, per scope, the ordered list of subscriptions the
//! scope made. Each record moves through three states:
//! - **Live**: the handler is bound on the bus
//! - **Revoked**: the handler was detached (unsubscribe, scope destruction,
//!   or a direct call to its [`Deregistration`])
//! - **Purged**: compaction removed the record from the scope's list
//!
//! Revoking reaches the bus at most once per record.
//!
//! # Example
//!
//! ```ignore
//! let tree = ScopeTree::new();
//! let scope = tree.new_scope();
//! let mediator = Mediator::new(RootBus::new());
//!
//! mediator.subscribe(&scope, "ping", handler(|_, args| println!("{:?}", args)))?;
//! mediator.emit("ping", &[json!("x")]);
//!
//! // Revokes "ping" without an explicit unsubscribe
//! scope.destroy();
//! ```

mod manager;
mod types;

pub use manager::Mediator;
pub use types::{Deregistration, MediatorConfig, SubscriptionRecord, SubscriptionSummary};
