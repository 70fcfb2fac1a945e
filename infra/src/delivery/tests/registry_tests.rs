//! Unit tests for provider registry wiring

use crate::delivery::build_registry;
use crate::InfrastructureError;
use ga_core::domain::Channel;
use ga_shared::config::{DeliveryConfig, TwilioConfig};

fn twilio_config() -> TwilioConfig {
    TwilioConfig {
        account_sid: "ACtest".to_string(),
        auth_token: "secret".to_string(),
        from_number: "+14155550100".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_console_registry_covers_every_channel() {
    let registry = build_registry(&DeliveryConfig::default(), &TwilioConfig::default()).unwrap();

    assert_eq!(registry.len(), Channel::ALL.len());
    for channel in Channel::ALL {
        assert_eq!(registry[&channel].provider_name(), "console");
    }
}

#[test]
fn test_twilio_registry() {
    let delivery = DeliveryConfig {
        provider: "twilio".to_string(),
        ..Default::default()
    };

    let registry = build_registry(&delivery, &twilio_config()).unwrap();
    assert_eq!(registry[&Channel::Voice].provider_name(), "twilio");
}

#[test]
fn test_twilio_without_credentials_fails() {
    let delivery = DeliveryConfig {
        provider: "twilio".to_string(),
        ..Default::default()
    };

    let Err(err) = build_registry(&delivery, &TwilioConfig::default()) else {
        panic!("twilio without credentials must be rejected");
    };
    assert!(matches!(err, InfrastructureError::Config(_)));
}

#[test]
fn test_unknown_provider_or_failure_mode_fails() {
    let delivery = DeliveryConfig {
        provider: "carrier-pigeon".to_string(),
        ..Default::default()
    };
    assert!(build_registry(&delivery, &TwilioConfig::default()).is_err());

    let delivery = DeliveryConfig {
        simulate_failure: "flaky".to_string(),
        ..Default::default()
    };
    assert!(build_registry(&delivery, &TwilioConfig::default()).is_err());
}
