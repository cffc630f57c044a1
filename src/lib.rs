//! # Scope Mediator
//!
//! A scoped publish/subscribe mediator over a global event bus. Components
//! subscribe to named events on behalf of an owning scope, and every
//! subscription a scope holds is revoked automatically when the scope is
//! destroyed.
//!
//! ## Core Concepts
//!
//! - **Bus**: The global event bus handlers are bound on ([`EventBus`])
//! - **Scopes**: Owning component instances with a destroy notification ([`Scope`])
//! - **Mediator**: The registry tracking which scope owns which subscription
//! - **Deregistration**: Single-use capability detaching one handler
//!
//! ## Example
//!
//! ```ignore
//! use scope_mediator::{handler, Mediator, RootBus, ScopeTree};
//! use serde_json::json;
//!
//! let tree = ScopeTree::new();
//! let panel = tree.new_scope();
//! let mediator = Mediator::new(RootBus::new());
//!
//! mediator.subscribe(&panel, "ping", handler(|event, args| {
//!     println!("{} {:?}", event.name, args);
//! }))?;
//!
//! mediator.emit("ping", &[json!("x")]);
//!
//! // No explicit unsubscribe needed
//! panel.destroy();
//! ```

pub mod bus;
pub mod error;
pub mod scope;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use bus::{EventBus, RootBus};
pub use error::{MediatorError, Result};
pub use scope::{Scope, ScopeHandle, ScopeTree};
pub use subscriptions::{
    Deregistration, Mediator, MediatorConfig, SubscriptionRecord, SubscriptionSummary,
};
pub use types::*;
