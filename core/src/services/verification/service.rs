//! OTP service facade used by the transport layer

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use ga_shared::phone::{is_valid_international_phone, mask_phone_number, normalize_phone_number};

use crate::domain::value_objects::{SendSummary, VerificationOutcome};
use crate::errors::{DomainError, DomainResult};
use crate::services::escalation::{EscalationEngine, SchedulerHandle};

use super::gate::VerificationGate;

/// The two operations exposed to callers: send and check
pub struct OtpService {
    engine: Arc<EscalationEngine>,
    gate: VerificationGate,
    scheduler: Option<SchedulerHandle>,
}

impl OtpService {
    pub fn new(engine: Arc<EscalationEngine>) -> Self {
        let gate = VerificationGate::for_engine(&engine);
        Self {
            engine,
            gate,
            scheduler: None,
        }
    }

    /// Register new sessions with a running escalation scheduler
    pub fn with_scheduler(mut self, scheduler: SchedulerHandle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn engine(&self) -> &Arc<EscalationEngine> {
        &self.engine
    }

    /// Start a verification session for `destination`
    ///
    /// The destination must be an E.164 number once formatting characters
    /// are stripped. The summary names the channel that actually delivered.
    pub async fn send_verification(
        &self,
        destination: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<SendSummary> {
        let destination = normalize_phone_number(destination);
        if !is_valid_international_phone(&destination) {
            return Err(DomainError::Validation {
                message: "Destination must be an international phone number (E.164)".to_string(),
            });
        }

        let handle = self.engine.start(&destination, cancel).await?;
        if let Some(scheduler) = &self.scheduler {
            scheduler.track(&handle);
        }

        let channel = handle.channel.ok_or_else(|| DomainError::Internal {
            message: "started session has no active channel".to_string(),
        })?;

        Ok(SendSummary {
            session_id: handle.session_id,
            channel,
            masked_destination: mask_phone_number(&destination),
            expires_at: handle.session_deadline,
        })
    }

    /// Check a submitted code
    ///
    /// Unknown or malformed session ids are reported as `NotFound`; only
    /// infrastructure failures come back as errors.
    pub async fn check_verification(
        &self,
        session_id: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<VerificationOutcome> {
        let Ok(id) = Uuid::parse_str(session_id.trim()) else {
            return Ok(VerificationOutcome::NotFound);
        };

        match self.gate.verify(id, code.trim(), cancel).await {
            Ok(result) => Ok(result.into()),
            Err(DomainError::SessionNotFound { .. }) => Ok(VerificationOutcome::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Whether the session store is reachable
    pub async fn health(&self) -> DomainResult<()> {
        self.engine.store().health_check().await?;
        Ok(())
    }
}
