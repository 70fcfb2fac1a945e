//! Redis configuration for the session store

use serde::{Deserialize, Serialize};

/// Redis connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Use Redis for session state (the in-memory store is used otherwise)
    pub enabled: bool,

    /// Redis connection URL
    pub url: String,

    /// Prefix for every key written by the session store
    pub key_prefix: String,

    /// Seconds a session stays readable after its absolute deadline
    /// (Redis TTL slack, or in-memory retention before purging)
    pub grace_ttl: u64,

    /// Seconds between purges of the in-memory store
    pub cleanup_interval: u64,

    /// Maximum number of connection attempts at startup
    pub max_retries: u32,

    /// Base delay between connection attempts in milliseconds (doubled each time)
    pub retry_delay_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::from("redis://localhost:6379"),
            key_prefix: String::from("otp"),
            grace_ttl: 600,
            cleanup_interval: 60,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl RedisConfig {
    /// Create a new Redis configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Generate a key with prefix
    pub fn make_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}
