//! Value objects returned across the core boundary

pub mod outcome;

pub use outcome::{MatchResult, SendSummary, SessionHandle, VerificationOutcome};
