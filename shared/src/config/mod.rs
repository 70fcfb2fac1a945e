//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `cache` - Redis connection for session state
//! - `delivery` - Delivery provider selection, retry and timeout policy
//! - `environment` - Environment detection and logging configuration
//! - `server` - HTTP server binding
//! - `strategy` - OTP format and the ordered escalation steps
//!
//! Configuration is read once at startup from an optional `policy.toml`
//! file and `GOAUTHY__*` environment variables, environment taking precedence.

pub mod cache;
pub mod delivery;
pub mod environment;
pub mod server;
pub mod strategy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::RedisConfig;
pub use delivery::{DeliveryConfig, TwilioConfig};
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use server::ServerConfig;
pub use strategy::{StepConfig, StrategyConfig};

/// Base name of the optional policy file (`policy.toml`, `policy.yaml`, ...)
pub const POLICY_FILE_NAME: &str = "policy";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "GOAUTHY";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Escalation strategy and OTP policy
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Delivery provider configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Twilio credentials (only required when the Twilio provider is selected)
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Redis session store configuration
    #[serde(default)]
    pub redis: RedisConfig,

    /// Logging configuration (defaults depend on the environment)
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl AppConfig {
    /// Load configuration from `policy.*` (in `.` or `./config`) and the environment
    ///
    /// A `.env` file is honoured when present. Nested keys are separated by a
    /// double underscore, e.g. `GOAUTHY__SERVER__PORT=9000`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(POLICY_FILE_NAME).required(false))
            .add_source(
                config::File::with_name(&format!("config/{}", POLICY_FILE_NAME)).required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// Effective logging configuration
    pub fn logging(&self) -> LoggingConfig {
        self.logging
            .clone()
            .unwrap_or_else(|| LoggingConfig::for_environment(self.environment))
    }

    /// Structural checks that do not need domain knowledge
    ///
    /// Strategy semantics (channel names, timeouts) are validated by the
    /// strategy table in the core crate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid {
                field: "server.port".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.delivery.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "delivery.send_timeout_ms".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.delivery.provider == "twilio" && !self.twilio.is_configured() {
            return Err(ConfigError::Invalid {
                field: "twilio".to_string(),
                message: "account_sid, auth_token and from_number are required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.strategy.steps.len(), 3);
    }

    #[test]
    fn test_twilio_provider_requires_credentials() {
        let mut config = AppConfig::default();
        config.delivery.provider = "twilio".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twilio"));

        config.twilio.account_sid = "AC123".to_string();
        config.twilio.auth_token = "secret".to_string();
        config.twilio.from_number = "+15550000000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_from_toml_source() {
        let toml = r#"
            [server]
            port = 9090

            [strategy]
            otp_length = 8
            code_policy = "rotate"

            [[strategy.steps]]
            method = "sms"
            timeout_secs = 30

            [[strategy.steps]]
            method = "voice"
            timeout_secs = 45
        "#;

        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let app: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(app.server.port, 9090);
        assert_eq!(app.strategy.otp_length, 8);
        assert_eq!(app.strategy.code_policy, "rotate");
        assert_eq!(app.strategy.steps.len(), 2);
        assert_eq!(app.strategy.steps[1].method, "voice");
        assert_eq!(app.strategy.max_attempts, 3);
    }
}
