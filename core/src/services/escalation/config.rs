//! Escalation engine configuration

use std::str::FromStr;
use std::time::Duration;

use ga_shared::{DeliveryConfig, StrategyConfig};

use crate::errors::{DomainError, DomainResult};

/// What happens to the code when escalating to the next step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodePolicy {
    /// Keep the code issued at start
    #[default]
    Reuse,
    /// Mint a fresh code for every step
    Rotate,
}

impl FromStr for CodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reuse" => Ok(CodePolicy::Reuse),
            "rotate" | "regenerate" => Ok(CodePolicy::Rotate),
            other => Err(format!("Unknown code policy: {}", other)),
        }
    }
}

/// Bounded retry with exponential backoff for transient delivery failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per step, first try included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based), doubling and capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// No retries, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Parameters of the engine and gate
#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Absolute session lifetime
    pub session_ttl: chrono::Duration,
    /// Verification attempts per session
    pub max_attempts: u32,
    pub code_policy: CodePolicy,
    /// Upper bound for one provider call
    pub send_timeout: Duration,
    pub retry: RetryPolicy,
    /// Re-runs of a read-modify-write after a version conflict
    pub conflict_retries: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::seconds(300),
            max_attempts: 3,
            code_policy: CodePolicy::Reuse,
            send_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            conflict_retries: 3,
        }
    }
}

impl EscalationConfig {
    pub fn from_config(strategy: &StrategyConfig, delivery: &DeliveryConfig) -> DomainResult<Self> {
        if strategy.otp_expiration_secs == 0 {
            return Err(DomainError::invalid_strategy(
                "otp_expiration_secs must be positive",
            ));
        }
        if strategy.max_attempts == 0 {
            return Err(DomainError::invalid_strategy("max_attempts must be positive"));
        }

        let session_ttl = chrono::Duration::from_std(Duration::from_secs(
            strategy.otp_expiration_secs,
        ))
        .map_err(|_| DomainError::invalid_strategy("otp_expiration_secs is out of range"))?;

        let code_policy = strategy
            .code_policy
            .parse::<CodePolicy>()
            .map_err(DomainError::invalid_strategy)?;

        Ok(Self {
            session_ttl,
            max_attempts: strategy.max_attempts,
            code_policy,
            send_timeout: Duration::from_millis(delivery.send_timeout_ms),
            retry: RetryPolicy {
                max_attempts: delivery.max_retries.max(1),
                base_delay: Duration::from_millis(delivery.retry_base_delay_ms),
                max_delay: Duration::from_millis(delivery.retry_max_delay_ms),
            },
            ..Default::default()
        })
    }
}
