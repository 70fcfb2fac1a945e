//! Escalation strategy configuration
//!
//! These are the raw, already-parsed values. The core crate turns them into an
//! immutable, validated strategy table at startup.

use serde::{Deserialize, Serialize};

/// One escalation step as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StepConfig {
    /// Channel name understood by the delivery adapters ("sms", "whatsapp", "voice")
    pub method: String,

    /// Seconds to wait for verification before escalating to the next step
    pub timeout_secs: u64,
}

impl StepConfig {
    pub fn new(method: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            method: method.into(),
            timeout_secs,
        }
    }
}

/// OTP format, verification policy and ordered escalation steps
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Number of characters in a generated code
    pub otp_length: usize,

    /// Characters a code is drawn from
    pub alphabet: String,

    /// Absolute session lifetime in seconds, across all steps
    pub otp_expiration_secs: u64,

    /// Verification attempts allowed per session
    pub max_attempts: u32,

    /// "reuse" keeps the code across escalation steps, "rotate" mints a new one
    pub code_policy: String,

    /// Ordered escalation steps
    pub steps: Vec<StepConfig>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            otp_length: 6,
            alphabet: String::from("0123456789"),
            otp_expiration_secs: 300,
            max_attempts: 3,
            code_policy: String::from("reuse"),
            steps: vec![
                StepConfig::new("sms", 60),
                StepConfig::new("whatsapp", 60),
                StepConfig::new("voice", 120),
            ],
        }
    }
}
