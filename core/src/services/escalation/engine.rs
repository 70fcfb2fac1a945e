//! Escalation engine
//!
//! Owns session creation and step advancement. Every write re-reads the
//! session from the store under the per-session lock and saves it back with a
//! version check, so a concurrent verify or a duplicate timer trigger can
//! never lose an update. Provider calls never run under that lock.

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use ga_shared::phone::mask_phone_number;

use crate::domain::entities::{Channel, VerificationSession};
use crate::domain::value_objects::SessionHandle;
use crate::errors::{DeliveryError, DomainError, DomainResult, StoreError};
use crate::repositories::SessionStore;
use crate::services::cancel::{cancellable, ensure_active};
use crate::services::clock::{Clock, SystemClock};
use crate::services::code_generator::CodeGenerator;
use crate::services::delivery::{DeliveryRegistry, OtpMessage};

use super::config::{CodePolicy, EscalationConfig};
use super::locks::SessionLocks;
use super::strategy::StrategyTable;

pub struct EscalationEngine {
    strategy: Arc<StrategyTable>,
    ports: DeliveryRegistry,
    store: Arc<dyn SessionStore>,
    generator: CodeGenerator,
    clock: Arc<dyn Clock>,
    locks: Arc<SessionLocks>,
    /// Held for a whole `advance` so duplicate triggers do not send twice
    advancing: Arc<SessionLocks>,
    config: EscalationConfig,
}

/// Outcome of the locked first half of `advance`
enum AdvancePlan {
    Settled(SessionHandle),
    Deliver(PendingStep),
}

/// Delivery that `advance` runs with the session unlocked
struct PendingStep {
    from_step: usize,
    destination: String,
    code: String,
}

impl EscalationEngine {
    /// Create an engine
    ///
    /// Fails with `InvalidStrategy` if a channel named by the strategy has no
    /// adapter in `ports`.
    pub fn new(
        strategy: StrategyTable,
        ports: DeliveryRegistry,
        store: Arc<dyn SessionStore>,
        config: EscalationConfig,
    ) -> DomainResult<Self> {
        strategy.ensure_resolvable(&ports)?;

        Ok(Self {
            strategy: Arc::new(strategy),
            ports,
            store,
            generator: CodeGenerator::default(),
            clock: Arc::new(SystemClock),
            locks: Arc::new(SessionLocks::new()),
            advancing: Arc::new(SessionLocks::new()),
            config,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_generator(mut self, generator: CodeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn strategy(&self) -> &StrategyTable {
        &self.strategy
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub(crate) fn locks(&self) -> Arc<SessionLocks> {
        Arc::clone(&self.locks)
    }

    /// Issue a code and deliver it on the first step that accepts it
    ///
    /// Transient failures are retried on the same step with backoff; permanent
    /// failures or exhausted retries move on to the next step. When no step
    /// delivers, nothing is persisted and `AllChannelsFailed` is returned.
    pub async fn start(
        &self,
        destination: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<SessionHandle> {
        ensure_active(cancel)?;

        let masked = mask_phone_number(destination);
        let code = self.generator.generate();
        let message = OtpMessage::new(code.clone());

        let delivered = cancellable(cancel, self.deliver_from(0, destination, &message)).await?;
        let Some(step_index) = delivered else {
            tracing::warn!(
                destination = %masked,
                event = "all_channels_failed",
                "No escalation step could deliver the code"
            );
            return Err(DomainError::AllChannelsFailed);
        };
        ensure_active(cancel)?;

        let now = self.clock.now();
        let session = VerificationSession::new(
            destination,
            code,
            step_index,
            now,
            self.step_deadline(step_index, now)?,
            now + self.config.session_ttl,
        );
        self.store.save(&session, None).await?;

        tracing::info!(
            session_id = %session.id,
            destination = %masked,
            step_index = step_index,
            channel = ?self.strategy.channel_at(step_index),
            event = "session_started",
            "Verification session created"
        );

        Ok(self.handle(&session))
    }

    /// Move a session forward once its step deadline has passed
    ///
    /// Safe to call at any time and any number of times: terminal sessions
    /// and sessions whose step is not yet due come back unchanged. The
    /// session deadline takes precedence over step advancement.
    ///
    /// The session lock is only held while deciding and while committing.
    /// Delivery to the next channels runs unlocked so a verify on the same
    /// session never waits on a provider. A verify or another writer that
    /// settles the session in between turns the commit into a no-op.
    pub async fn advance(
        &self,
        session_id: Uuid,
        cancel: &CancellationToken,
    ) -> DomainResult<SessionHandle> {
        let Some(_advancing) = self.advancing.try_acquire(session_id) else {
            // Another advance of this session is delivering right now
            return Ok(self.handle(&self.load(session_id).await?));
        };

        let plan = {
            let _guard = cancellable(cancel, self.locks.acquire(session_id)).await?;
            self.retry_conflicts(session_id, || self.try_plan(session_id, cancel))
                .await?
        };
        let plan = match plan {
            AdvancePlan::Settled(handle) => return Ok(handle),
            AdvancePlan::Deliver(plan) => plan,
        };

        let message = OtpMessage::new(plan.code.clone());
        let delivered = cancellable(
            cancel,
            self.deliver_from(plan.from_step + 1, &plan.destination, &message),
        )
        .await?;

        let _guard = cancellable(cancel, self.locks.acquire(session_id)).await?;
        self.retry_conflicts(session_id, || {
            self.try_commit(session_id, &plan, delivered, cancel)
        })
        .await
    }

    /// Decide what `advance` has to do; expiry is written straight away
    async fn try_plan(
        &self,
        session_id: Uuid,
        cancel: &CancellationToken,
    ) -> DomainResult<AdvancePlan> {
        let mut session = self.load(session_id).await?;
        if session.is_terminal() {
            return Ok(AdvancePlan::Settled(self.handle(&session)));
        }

        let now = self.clock.now();
        if session.is_expired_at(now) {
            session.expire();
            self.commit(&mut session, cancel).await?;
            return Ok(AdvancePlan::Settled(self.handle(&session)));
        }
        if !session.is_step_due_at(now) {
            return Ok(AdvancePlan::Settled(self.handle(&session)));
        }

        let code = match self.config.code_policy {
            CodePolicy::Reuse => session.current_code.clone(),
            CodePolicy::Rotate => self.generator.generate(),
        };
        Ok(AdvancePlan::Deliver(PendingStep {
            from_step: session.step_index,
            destination: session.destination,
            code,
        }))
    }

    /// Apply a finished delivery run to the freshly read session
    async fn try_commit(
        &self,
        session_id: Uuid,
        plan: &PendingStep,
        delivered: Option<usize>,
        cancel: &CancellationToken,
    ) -> DomainResult<SessionHandle> {
        let mut session = self.load(session_id).await?;
        if session.is_terminal() || session.step_index != plan.from_step {
            tracing::debug!(
                session_id = %session_id,
                status = %session.status,
                step_index = session.step_index,
                "Session changed while delivering, keeping stored state"
            );
            return Ok(self.handle(&session));
        }

        // Delivery may have taken long enough for the session to lapse.
        let now = self.clock.now();
        match delivered {
            _ if session.is_expired_at(now) => session.expire(),
            Some(index) => {
                let deadline = self.step_deadline(index, now)?;
                session.escalate_to(index, plan.code.clone(), deadline);
            }
            None => session.exhaust_steps(self.strategy.len()),
        }

        self.commit(&mut session, cancel).await?;
        Ok(self.handle(&session))
    }

    /// Versioned write of an advanced session
    async fn commit(
        &self,
        session: &mut VerificationSession,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        ensure_active(cancel)?;
        let observed = session.version;
        session.version = observed + 1;
        self.store.save(session, Some(observed)).await?;

        tracing::info!(
            session_id = %session.id,
            status = %session.status,
            step_index = session.step_index,
            channel = ?self.strategy.channel_at(session.step_index),
            event = "session_advanced",
            "Escalation step processed"
        );
        Ok(())
    }

    /// Re-run `op` after version conflicts, up to `conflict_retries` times
    async fn retry_conflicts<T, F, Fut>(&self, session_id: Uuid, mut op: F) -> DomainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let mut conflicts = 0;
        loop {
            match op().await {
                Err(DomainError::Store(StoreError::Conflict { .. }))
                    if conflicts < self.config.conflict_retries =>
                {
                    conflicts += 1;
                    tracing::debug!(
                        session_id = %session_id,
                        conflicts = conflicts,
                        "Concurrent update detected, re-reading session"
                    );
                }
                other => return other,
            }
        }
    }

    async fn load(&self, session_id: Uuid) -> DomainResult<VerificationSession> {
        self.store
            .get(&session_id)
            .await?
            .ok_or_else(|| DomainError::SessionNotFound {
                id: session_id.to_string(),
            })
    }

    /// Try steps from `first` onwards; returns the index that delivered
    async fn deliver_from(
        &self,
        first: usize,
        destination: &str,
        message: &OtpMessage,
    ) -> Option<usize> {
        for (index, step) in self.strategy.steps().iter().enumerate().skip(first) {
            match self.deliver_step(step.channel, destination, message).await {
                Ok(reference) => {
                    tracing::info!(
                        destination = %mask_phone_number(destination),
                        channel = %step.channel,
                        step_index = index,
                        reference = %reference,
                        event = "otp_delivered",
                        "Code delivered"
                    );
                    return Some(index);
                }
                Err(e) => {
                    tracing::warn!(
                        destination = %mask_phone_number(destination),
                        channel = %step.channel,
                        step_index = index,
                        error = %e,
                        event = "step_delivery_failed",
                        "Delivery failed on this step, escalating"
                    );
                }
            }
        }
        None
    }

    /// One step with bounded retries; each call is capped by `send_timeout`
    async fn deliver_step(
        &self,
        channel: Channel,
        destination: &str,
        message: &OtpMessage,
    ) -> Result<String, DeliveryError> {
        let Some(port) = self.ports.get(&channel) else {
            return Err(DeliveryError::Permanent(format!(
                "no adapter registered for {}",
                channel
            )));
        };

        let retry = self.config.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut last_error = DeliveryError::Transient("not attempted".to_string());

        for attempt in 1..=max_attempts {
            let sent = tokio::time::timeout(
                self.config.send_timeout,
                port.send(destination, channel, message),
            )
            .await;

            match sent {
                Ok(Ok(reference)) => return Ok(reference),
                Ok(Err(DeliveryError::Permanent(reason))) => {
                    return Err(DeliveryError::Permanent(reason))
                }
                Ok(Err(error)) => last_error = error,
                Err(_) => {
                    last_error = DeliveryError::Transient(format!(
                        "{} did not answer within {:?}",
                        port.provider_name(),
                        self.config.send_timeout
                    ))
                }
            }

            if attempt < max_attempts {
                let delay = retry.delay_for(attempt);
                tracing::debug!(
                    channel = %channel,
                    attempt = attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "Retrying transient delivery failure"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error)
    }

    fn step_deadline(
        &self,
        index: usize,
        from: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<chrono::DateTime<chrono::Utc>> {
        self.strategy
            .deadline_for(index, from)
            .ok_or_else(|| DomainError::Internal {
                message: format!("step {} is outside the strategy table", index),
            })
    }

    fn handle(&self, session: &VerificationSession) -> SessionHandle {
        SessionHandle::new(session, self.strategy.channel_at(session.step_index))
    }
}
