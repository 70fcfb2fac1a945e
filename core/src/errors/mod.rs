//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

pub use types::{DeliveryError, StoreError};

use thiserror::Error;

/// Core domain errors
///
/// Verification outcomes such as a mismatched or expired code are not errors;
/// they are reported through `MatchResult` and `VerificationOutcome`.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Strategy table or engine configuration rejected at construction
    #[error("Invalid strategy: {message}")]
    InvalidStrategy { message: String },

    /// Every configured step failed to deliver during start
    #[error("All delivery channels failed")]
    AllChannelsFailed,

    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn invalid_strategy(message: impl Into<String>) -> Self {
        DomainError::InvalidStrategy {
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::AllChannelsFailed
                | DomainError::Store(StoreError::Unavailable(_))
                | DomainError::Store(StoreError::Conflict { .. })
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
