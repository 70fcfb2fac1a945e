//! # GoAuthy Core
//!
//! OTP lifecycle and multi-channel escalation engine.
//! This crate contains the verification session model, the code generator,
//! the strategy table, the delivery and session store ports, the escalation
//! engine with its scheduler, and the verification gate.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
