//! Delivery channel enumeration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A communication channel an OTP can be delivered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    WhatsApp,
    Voice,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Sms, Channel::WhatsApp, Channel::Voice];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::WhatsApp => "whatsapp",
            Channel::Voice => "voice",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "whatsapp" | "whats_app" => Ok(Channel::WhatsApp),
            "voice" | "call" => Ok(Channel::Voice),
            other => Err(format!("Unknown delivery channel: {}", other)),
        }
    }
}
