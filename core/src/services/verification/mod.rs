//! Verification module
//!
//! - `VerificationGate` validates submitted codes with attempt and expiry rules
//! - `OtpService` is the send/check facade the transport layer calls

mod gate;
mod service;


pub use gate::VerificationGate;
pub use service::OtpService;
