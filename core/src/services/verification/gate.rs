//! Verification gate: checks a submitted code against its session

use constant_time_eq::constant_time_eq;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::entities::SessionStatus;
use crate::domain::value_objects::MatchResult;
use crate::errors::{DomainError, DomainResult, StoreError};
use crate::repositories::SessionStore;
use crate::services::cancel::{cancellable, ensure_active};
use crate::services::clock::Clock;
use crate::services::escalation::{EscalationConfig, EscalationEngine, SessionLocks};

pub struct VerificationGate {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    locks: Arc<SessionLocks>,
    max_attempts: u32,
    conflict_retries: u32,
}

impl VerificationGate {
    /// Gate with its attempt and conflict budgets taken from `config`
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        locks: Arc<SessionLocks>,
        config: &EscalationConfig,
    ) -> Self {
        Self {
            store,
            clock,
            locks,
            max_attempts: config.max_attempts.max(1),
            conflict_retries: config.conflict_retries,
        }
    }

    /// Gate sharing the engine's store, clock and session locks
    pub fn for_engine(engine: &EscalationEngine) -> Self {
        Self::new(engine.store(), engine.clock(), engine.locks(), engine.config())
    }

    /// Check `submitted` against session `session_id`
    ///
    /// Order of checks: unknown id (`SessionNotFound` error), terminal session
    /// (reported as-is, nothing mutated), absolute deadline (`Expired`), then
    /// the attempt budget. The attempt that reaches `max_attempts` yields
    /// `TooManyAttempts` whatever code was submitted.
    pub async fn verify(
        &self,
        session_id: Uuid,
        submitted: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<MatchResult> {
        let _guard = cancellable(cancel, self.locks.acquire(session_id)).await?;

        let mut conflicts = 0;
        loop {
            match self.try_verify(session_id, submitted, cancel).await {
                Err(DomainError::Store(StoreError::Conflict { .. }))
                    if conflicts < self.conflict_retries =>
                {
                    conflicts += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_verify(
        &self,
        session_id: Uuid,
        submitted: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<MatchResult> {
        let mut session = cancellable(cancel, self.store.get(&session_id))
            .await??
            .ok_or_else(|| DomainError::SessionNotFound {
                id: session_id.to_string(),
            })?;

        if session.is_terminal() {
            return Ok(MatchResult::Terminal {
                status: session.status,
                attempts_exhausted: session.status == SessionStatus::Exhausted
                    && session.attempt_count >= self.max_attempts,
            });
        }

        let observed = session.version;
        let result = if session.is_expired_at(self.clock.now()) {
            session.expire();
            MatchResult::Expired
        } else {
            let attempts = session.record_attempt();
            if attempts >= self.max_attempts {
                session.exhaust_attempts();
                MatchResult::TooManyAttempts
            } else if constant_time_eq(submitted.as_bytes(), session.current_code.as_bytes()) {
                session.mark_verified();
                MatchResult::Success
            } else {
                MatchResult::Mismatch {
                    remaining_attempts: self.max_attempts - attempts - 1,
                }
            }
        };

        ensure_active(cancel)?;
        session.version = observed + 1;
        self.store.save(&session, Some(observed)).await?;

        match result {
            MatchResult::Success => tracing::info!(
                session_id = %session_id,
                attempts = session.attempt_count,
                event = "otp_verified",
                "Code verified"
            ),
            MatchResult::Mismatch { remaining_attempts } => tracing::warn!(
                session_id = %session_id,
                attempts = session.attempt_count,
                remaining_attempts = remaining_attempts,
                event = "otp_mismatch",
                "Submitted code does not match"
            ),
            _ => tracing::warn!(
                session_id = %session_id,
                status = %session.status,
                attempts = session.attempt_count,
                event = "otp_rejected",
                "Verification rejected"
            ),
        }

        Ok(result)
    }
}
