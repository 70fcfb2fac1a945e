//! HTTP transport for the one-time code service
//!
//! Exposes `POST /v1/otp/send`, `POST /v1/otp/verify` and `GET /health`
//! on top of `ga_core::services::OtpService`.

pub mod app;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use app::{configure_routes, create_app, AppState};
