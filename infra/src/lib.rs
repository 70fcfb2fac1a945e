//! # Infrastructure Layer
//!
//! Concrete adapters for the ports defined in `ga_core`:
//!
//! - **Cache**: Redis client and the Redis-backed `SessionStore`
//! - **Delivery**: console and Twilio implementations of `DeliveryPort`,
//!   plus the registry that maps each channel to its adapter
//!
//! Nothing in here owns business rules. Adapters translate provider and
//! backend failures into the port error vocabularies (`DeliveryError`,
//! `StoreError`) and leave every decision to the engine.

/// Cache module - Redis client and session persistence
pub mod cache;

/// Delivery module - channel adapters and provider registry
pub mod delivery;

pub use cache::{RedisClient, RedisSessionStore};
pub use delivery::{build_registry, ConsoleDeliveryPort, SimulatedFailure, TwilioDeliveryPort};

use ga_core::errors::StoreError;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for StoreError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Serialization(e) => StoreError::Serialization(e.to_string()),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}
