//! Delivery adapters and provider registry
//!
//! `build_registry` turns the delivery configuration into the
//! channel-to-adapter map the escalation engine is built with. One provider
//! backs every channel; the engine still checks at startup that each channel
//! named by the strategy resolves.

pub mod console;
pub mod twilio;

#[cfg(test)]
mod tests;

pub use console::{ConsoleDeliveryPort, SimulatedFailure};
pub use twilio::{TwilioDeliveryPort, TwilioRequest};

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ga_core::domain::Channel;
use ga_core::services::{DeliveryPort, DeliveryRegistry};
use ga_shared::config::{DeliveryConfig, TwilioConfig};

use crate::InfrastructureError;

/// Build the channel registry for the configured provider
pub fn build_registry(
    delivery: &DeliveryConfig,
    twilio: &TwilioConfig,
) -> Result<DeliveryRegistry, InfrastructureError> {
    let port: Arc<dyn DeliveryPort> = match delivery.provider.trim().to_lowercase().as_str() {
        "console" | "mock" => {
            let failure = delivery
                .simulate_failure
                .parse::<SimulatedFailure>()
                .map_err(InfrastructureError::Config)?;
            Arc::new(ConsoleDeliveryPort::with_options(true, failure))
        }
        "twilio" => Arc::new(TwilioDeliveryPort::new(
            twilio.clone(),
            Duration::from_millis(delivery.send_timeout_ms),
        )?),
        other => {
            return Err(InfrastructureError::Config(format!(
                "Unknown delivery provider: {}",
                other
            )))
        }
    };

    info!(provider = port.provider_name(), "Delivery registry built");

    Ok(Channel::ALL
        .iter()
        .map(|channel| (*channel, Arc::clone(&port)))
        .collect())
}
