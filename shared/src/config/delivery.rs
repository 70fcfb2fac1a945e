//! Delivery provider configuration

use serde::{Deserialize, Serialize};

/// Delivery provider selection and per-call resilience policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Provider backing every channel ("console" or "twilio")
    pub provider: String,

    /// Upper bound for a single provider call in milliseconds
    pub send_timeout_ms: u64,

    /// Attempts per step before escalating (first try included)
    pub max_retries: u32,

    /// Initial backoff between attempts in milliseconds
    pub retry_base_delay_ms: u64,

    /// Backoff cap in milliseconds
    pub retry_max_delay_ms: u64,

    /// Console provider only: "none", "transient" or "permanent"
    pub simulate_failure: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            provider: String::from("console"),
            send_timeout_ms: 5_000,
            max_retries: 3,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 2_000,
            simulate_failure: String::from("none"),
        }
    }
}

/// Twilio credentials and sender identities
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: String,

    /// Twilio Auth Token
    pub auth_token: String,

    /// Sender number for SMS and voice (E.164)
    pub from_number: String,

    /// Sender number for WhatsApp, defaults to `from_number`
    pub whatsapp_from: Option<String>,

    /// REST API base URL
    pub api_base: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            whatsapp_from: None,
            api_base: String::from("https://api.twilio.com/2010-04-01"),
        }
    }
}

impl TwilioConfig {
    /// Whether the mandatory credentials are present
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && self.from_number.starts_with('+')
    }

    /// Sender used for WhatsApp messages
    pub fn whatsapp_sender(&self) -> &str {
        self.whatsapp_from.as_deref().unwrap_or(&self.from_number)
    }
}
