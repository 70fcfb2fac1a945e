//! Console delivery adapter
//!
//! Prints the message to stdout instead of contacting a provider. Meant for
//! local development, where nobody wants to pay for an SMS to read a code.
//! Failure simulation lets demos exercise escalation without a real outage.

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use ga_core::domain::Channel;
use ga_core::errors::DeliveryError;
use ga_core::services::{DeliveryPort, OtpMessage};
use ga_shared::utils::phone::mask_phone_number;

/// Failure mode injected by the console adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedFailure {
    #[default]
    None,
    Transient,
    Permanent,
}

impl FromStr for SimulatedFailure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "off" => Ok(SimulatedFailure::None),
            "transient" => Ok(SimulatedFailure::Transient),
            "permanent" => Ok(SimulatedFailure::Permanent),
            other => Err(format!("Unknown failure simulation: {}", other)),
        }
    }
}

/// Delivery adapter that writes to the console
#[derive(Clone)]
pub struct ConsoleDeliveryPort {
    message_count: Arc<AtomicU64>,
    failure: SimulatedFailure,
    console_output: bool,
    latency: Duration,
}

impl ConsoleDeliveryPort {
    pub fn new() -> Self {
        Self {
            message_count: Arc::new(AtomicU64::new(0)),
            failure: SimulatedFailure::None,
            console_output: true,
            latency: Duration::ZERO,
        }
    }

    /// Create an adapter with configurable options
    pub fn with_options(console_output: bool, failure: SimulatedFailure) -> Self {
        Self {
            console_output,
            failure,
            ..Self::new()
        }
    }

    /// Delay every send, to mimic network round-trips
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of messages "delivered" so far
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::SeqCst)
    }

    pub fn failure(&self) -> SimulatedFailure {
        self.failure
    }
}

impl Default for ConsoleDeliveryPort {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryPort for ConsoleDeliveryPort {
    async fn send(
        &self,
        destination: &str,
        channel: Channel,
        message: &OtpMessage,
    ) -> Result<String, DeliveryError> {
        let masked = mask_phone_number(destination);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.failure {
            SimulatedFailure::None => {}
            SimulatedFailure::Transient => {
                warn!(provider = "console", channel = %channel, destination = %masked, "Simulating transient delivery failure");
                return Err(DeliveryError::Transient("simulated provider outage".to_string()));
            }
            SimulatedFailure::Permanent => {
                warn!(provider = "console", channel = %channel, destination = %masked, "Simulating permanent delivery failure");
                return Err(DeliveryError::Permanent("simulated rejected destination".to_string()));
            }
        }

        let reference = format!("console_{}", Uuid::new_v4());
        let count = self.message_count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.console_output {
            let body = match channel {
                Channel::Voice => message.spoken(),
                Channel::Sms | Channel::WhatsApp => message.text(),
            };
            println!("\n{}", "=".repeat(60));
            println!("CONSOLE {} DELIVERY - MESSAGE #{}", channel.as_str().to_uppercase(), count);
            println!("{}", "=".repeat(60));
            println!("To: {}", masked);
            println!("Reference: {}", reference);
            println!("Content: {}", body);
            println!("{}\n", "=".repeat(60));
        }

        info!(
            target: "delivery",
            provider = "console",
            channel = %channel,
            destination = %masked,
            reference = %reference,
            "OTP delivered to console"
        );

        Ok(reference)
    }

    fn provider_name(&self) -> &str {
        "console"
    }
}
