//! Delivery port contract

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::entities::Channel;
use crate::errors::DeliveryError;

/// Payload handed to a delivery adapter
///
/// Adapters choose the rendering that fits their medium: text for SMS and
/// WhatsApp, a spoken script for voice calls.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpMessage {
    pub code: String,
}

impl OtpMessage {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    /// Text body for SMS and WhatsApp
    pub fn text(&self) -> String {
        format!("Your security code is: {}", self.code)
    }

    /// Script for a voice call, one character at a time with pauses
    pub fn spoken(&self) -> String {
        let spelled: Vec<String> = self.code.chars().map(|c| c.to_string()).collect();
        format!("Your security code is: {}.", spelled.join(", "))
    }
}

impl std::fmt::Debug for OtpMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpMessage").field("code", &"<redacted>").finish()
    }
}

/// Uniform send capability implemented by every channel adapter
#[async_trait]
pub trait DeliveryPort: Send + Sync {
    /// Deliver `message` to `destination` over `channel`
    ///
    /// Returns a provider reference (message or call id) on success.
    async fn send(
        &self,
        destination: &str,
        channel: Channel,
        message: &OtpMessage,
    ) -> Result<String, DeliveryError>;

    /// Provider name for logs
    fn provider_name(&self) -> &str;
}

/// Channel to adapter mapping injected into the engine
pub type DeliveryRegistry = HashMap<Channel, Arc<dyn DeliveryPort>>;
