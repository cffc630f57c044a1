//! Error types for the mediator.

use thiserror::Error;

/// Main error type for mediator operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediatorError {
    #[error("No subscription for event {event:?} on scope {scope}")]
    NotFound { scope: String, event: String },

    #[error("Scope already destroyed: {0}")]
    ScopeDestroyed(String),
}

impl MediatorError {
    pub(crate) fn not_found(scope: &impl std::fmt::Debug, event: &str) -> Self {
        MediatorError::NotFound {
            scope: format!("{:?}", scope),
            event: event.to_string(),
        }
    }

    pub(crate) fn scope_destroyed(scope: &impl std::fmt::Debug) -> Self {
        MediatorError::ScopeDestroyed(format!("{:?}", scope))
    }
}

/// Result type for mediator operations.
pub type Result<T> = std::result::Result<T, MediatorError>;
