//! Shared utilities and common types for the GoAuthy server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types and loading
//! - Error response structures
//! - Utility functions (phone validation and masking)

pub mod config;
pub mod errors;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, ConfigError, DeliveryConfig, Environment, LogFormat, LoggingConfig, RedisConfig,
    ServerConfig, StepConfig, StrategyConfig, TwilioConfig,
};
pub use errors::{error_codes, ErrorResponse};
pub use utils::phone;
