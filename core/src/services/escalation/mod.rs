//! Escalation module: strategy table, engine and timer-driven advancement
//!
//! - `StrategyTable` holds the validated, ordered (channel, timeout) steps
//! - `EscalationEngine` creates sessions and moves them between steps
//! - `EscalationScheduler` fires `advance` when step deadlines pass

mod config;
mod engine;
mod locks;
mod scheduler;
mod strategy;

#[cfg(test)]
mod tests;

pub use config::{CodePolicy, EscalationConfig, RetryPolicy};
pub use engine::EscalationEngine;
pub use locks::{SessionGuard, SessionLocks};
pub use scheduler::{EscalationScheduler, SchedulerHandle};
pub use strategy::{StrategyStep, StrategyTable};
