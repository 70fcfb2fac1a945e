//! Application state and factory
//!
//! This module holds the state shared by every worker and builds the
//! Actix-web application around it.

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App, HttpResponse,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_actix_web::TracingLogger;

use ga_core::services::OtpService;
use ga_shared::{error_codes, ErrorResponse};

use crate::handlers::json_error_handler;
use crate::routes::{health::health_check, otp};

/// State shared by all request handlers
pub struct AppState {
    pub otp: Arc<OtpService>,
    /// Cancelled on shutdown; each request works under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(otp: Arc<OtpService>, shutdown: CancellationToken) -> Self {
        Self { otp, shutdown }
    }
}

/// Register every route on a service config
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/v1/otp")
            .route("/send", web::post().to(otp::send_code))
            .route("/verify", web::post().to(otp::verify_code)),
    );
}

/// Create and configure the application with all dependencies
pub fn create_app(
    app_state: web::Data<AppState>,
    cors: Cors,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(app_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        // Logging is outermost so rejected preflights are traced too
        .wrap(cors)
        .wrap(TracingLogger::default())
        .configure(configure_routes)
        .default_service(web::route().to(not_found))
}

/// Default 404 handler
async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new(
        error_codes::NOT_FOUND,
        "The requested resource was not found",
    ))
}
