//! Owning scopes and their destruction notification.
//!
//! A scope is the unit of subscription lifetime: the registry keys records by
//! [`Scope::id`] and hooks [`Scope::on_destroy`] to revoke them.
//! [`ScopeTree`] is the in-process hierarchy used by the tests and by
//! applications without a host framework of their own.

mod tree;

pub use tree::{ScopeHandle, ScopeTree};

use crate::types::{DestroyCallback, ScopeKey};

/// An owning component instance with a single destruction moment.
pub trait Scope {
    /// Stable identity for the whole lifetime of the scope.
    type Id: ScopeKey;

    fn id(&self) -> Self::Id;

    /// Run `callback` once, synchronously, when this scope is destroyed.
    fn on_destroy(&self, callback: DestroyCallback<Self::Id>);

    /// Whether the destroy notification has already fired.
    fn is_destroyed(&self) -> bool {
        false
    }
}
