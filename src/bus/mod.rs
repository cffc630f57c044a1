//! Event bus the mediator binds handlers on.
//!
//! The registry only needs two things from a bus: binding a handler to a
//! name (getting back a way to undo that binding) and broadcasting to every
//! handler bound to a name. [`EventBus`] captures exactly that, and
//! [`RootBus`] is the in-process implementation.
//!
//! # Example
//!
//! ```ignore
//! let bus = RootBus::new();
//! let revoke = bus.bind("ping", handler(|event, args| println!("{} {:?}", event.name, args)));
//! bus.broadcast("ping", &[json!("x")]);
//! revoke();
//! ```

mod root;

pub use root::RootBus;

use crate::types::{Handler, RevokeFn};
use serde_json::Value;

/// A global, name-keyed event bus.
pub trait EventBus: Send + Sync + 'static {
    /// Bind `handler` to `event_name`.
    ///
    /// The returned function removes this exact binding.
    fn bind(&self, event_name: &str, handler: Handler) -> RevokeFn;

    /// Synchronously invoke every handler currently bound to `event_name`.
    fn broadcast(&self, event_name: &str, args: &[Value]);
}
