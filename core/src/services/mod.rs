//! Business services containing domain logic and use cases.

pub(crate) mod cancel;
pub mod cleanup;
pub mod clock;
pub mod code_generator;
pub mod delivery;
pub mod escalation;
pub mod verification;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use cleanup::{SessionCleanupConfig, SessionCleanupService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use code_generator::CodeGenerator;
pub use delivery::{DeliveryPort, DeliveryRegistry, OtpMessage, RecordingDeliveryPort, SentMessage};
pub use escalation::{
    CodePolicy, EscalationConfig, EscalationEngine, EscalationScheduler, RetryPolicy,
    SchedulerHandle, StrategyStep, StrategyTable,
};
pub use verification::{OtpService, VerificationGate};
