//! Fixtures shared by the service unit tests

use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::entities::{Channel, VerificationSession};
use crate::repositories::{InMemorySessionStore, SessionStore};
use crate::services::clock::ManualClock;
use crate::services::delivery::{DeliveryPort, DeliveryRegistry, RecordingDeliveryPort};
use crate::services::escalation::{EscalationConfig, EscalationEngine, RetryPolicy, StrategyStep, StrategyTable};

pub const DESTINATION: &str = "+15551234567";

pub fn fast_config() -> EscalationConfig {
    EscalationConfig {
        send_timeout: Duration::from_secs(1),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(40),
        },
        ..EscalationConfig::default()
    }
}

pub fn sms_voice() -> Vec<StrategyStep> {
    vec![
        StrategyStep::secs(Channel::Sms, 30),
        StrategyStep::secs(Channel::Voice, 30),
    ]
}

pub fn sms_whatsapp_voice() -> Vec<StrategyStep> {
    vec![
        StrategyStep::secs(Channel::Sms, 30),
        StrategyStep::secs(Channel::WhatsApp, 30),
        StrategyStep::secs(Channel::Voice, 30),
    ]
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub sessions: Arc<InMemorySessionStore>,
    pub sms: Arc<RecordingDeliveryPort>,
    pub whatsapp: Arc<RecordingDeliveryPort>,
    pub voice: Arc<RecordingDeliveryPort>,
    pub engine: Arc<EscalationEngine>,
}

impl Harness {
    pub fn new(steps: Vec<StrategyStep>, config: EscalationConfig) -> Self {
        let sessions = Arc::new(InMemorySessionStore::new());
        Self::with_store(steps, config, sessions.clone(), sessions)
    }

    /// `store` is what the engine writes to; `sessions` is what tests inspect
    pub fn with_store(
        steps: Vec<StrategyStep>,
        config: EscalationConfig,
        store: Arc<dyn SessionStore>,
        sessions: Arc<InMemorySessionStore>,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let sms = Arc::new(RecordingDeliveryPort::new("sms"));
        let whatsapp = Arc::new(RecordingDeliveryPort::new("whatsapp"));
        let voice = Arc::new(RecordingDeliveryPort::new("voice"));

        let mut ports: DeliveryRegistry = HashMap::new();
        ports.insert(Channel::Sms, sms.clone() as Arc<dyn DeliveryPort>);
        ports.insert(Channel::WhatsApp, whatsapp.clone() as Arc<dyn DeliveryPort>);
        ports.insert(Channel::Voice, voice.clone() as Arc<dyn DeliveryPort>);

        let engine = EscalationEngine::new(StrategyTable::new(steps).unwrap(), ports, store, config)
            .unwrap()
            .with_clock(clock.clone());

        Self {
            clock,
            sessions,
            sms,
            whatsapp,
            voice,
            engine: Arc::new(engine),
        }
    }

    pub async fn session(&self, id: Uuid) -> VerificationSession {
        self.sessions.get(&id).await.unwrap().expect("session exists")
    }
}
