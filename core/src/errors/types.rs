//! Port-level error types
//!
//! These are the failure vocabularies of the two external contracts the
//! engine depends on. Adapters produce them; the engine and gate translate
//! them into `DomainError` before anything reaches a caller.

use thiserror::Error;

/// Outcome of a failed delivery attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Retryable on the same channel (timeouts, throttling, provider 5xx)
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// Not worth retrying on this channel; the engine escalates immediately
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient(_))
    }
}

/// Session store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another writer changed the session after it was read
    #[error("Version conflict on session {id}")]
    Conflict { id: String },

    #[error("Session store unavailable: {0}")]
    Unavailable(String),

    #[error("Session serialization failed: {0}")]
    Serialization(String),
}
