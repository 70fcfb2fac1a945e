//! Request and response bodies

pub mod otp;

pub use ga_shared::ErrorResponse;
pub use otp::{SendCodeRequest, SendCodeResponse, VerifyCodeRequest, VerifyCodeResponse};
