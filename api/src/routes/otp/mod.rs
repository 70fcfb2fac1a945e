//! One-time code endpoints
//!
//! - `POST /v1/otp/send` starts a session and delivers the first code
//! - `POST /v1/otp/verify` checks a submitted code

pub mod send_code;
pub mod verify_code;

pub use send_code::send_code;
pub use verify_code::verify_code;
