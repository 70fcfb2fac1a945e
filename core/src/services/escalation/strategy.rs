//! Strategy table: the ordered, immutable list of escalation steps

use chrono::{DateTime, Utc};
use std::time::Duration;

use ga_shared::StrategyConfig;

use crate::domain::entities::Channel;
use crate::errors::{DomainError, DomainResult};
use crate::services::delivery::DeliveryRegistry;

/// One (channel, timeout) escalation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyStep {
    pub channel: Channel,
    pub timeout: Duration,
}

impl StrategyStep {
    pub fn new(channel: Channel, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub fn secs(channel: Channel, secs: u64) -> Self {
        Self::new(channel, Duration::from_secs(secs))
    }
}

/// Validated escalation order, built once at startup
#[derive(Debug, Clone)]
pub struct StrategyTable {
    steps: Vec<StrategyStep>,
    timeouts: Vec<chrono::Duration>,
}

impl StrategyTable {
    /// Validate and freeze a list of steps
    ///
    /// Fails with `InvalidStrategy` when the list is empty or a timeout is
    /// zero or too large to represent as a timestamp offset.
    pub fn new(steps: Vec<StrategyStep>) -> DomainResult<Self> {
        if steps.is_empty() {
            return Err(DomainError::invalid_strategy(
                "at least one escalation step is required",
            ));
        }

        let mut timeouts = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            if step.timeout.is_zero() {
                return Err(DomainError::invalid_strategy(format!(
                    "step {} ({}) must have a positive timeout",
                    index, step.channel
                )));
            }
            let delta = chrono::Duration::from_std(step.timeout).map_err(|_| {
                DomainError::invalid_strategy(format!("step {} timeout is out of range", index))
            })?;
            timeouts.push(delta);
        }

        Ok(Self { steps, timeouts })
    }

    /// Build from configuration, resolving channel names
    pub fn from_config(config: &StrategyConfig) -> DomainResult<Self> {
        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let channel = step.method.parse::<Channel>().map_err(|e| {
                    DomainError::invalid_strategy(format!("step {}: {}", index, e))
                })?;
                Ok(StrategyStep::secs(channel, step.timeout_secs))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Self::new(steps)
    }

    /// Every channel in the table must have an adapter
    pub fn ensure_resolvable(&self, registry: &DeliveryRegistry) -> DomainResult<()> {
        match self.steps.iter().find(|s| !registry.contains_key(&s.channel)) {
            Some(step) => Err(DomainError::invalid_strategy(format!(
                "no delivery adapter registered for channel '{}'",
                step.channel
            ))),
            None => Ok(()),
        }
    }

    pub fn step(&self, index: usize) -> Option<&StrategyStep> {
        self.steps.get(index)
    }

    /// Channel of step `index`, `None` past the end
    pub fn channel_at(&self, index: usize) -> Option<Channel> {
        self.step(index).map(|s| s.channel)
    }

    /// Deadline of step `index` if it starts at `from`
    pub fn deadline_for(&self, index: usize, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.timeouts.get(index).map(|t| from + *t)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StrategyStep] {
        &self.steps
    }
}
