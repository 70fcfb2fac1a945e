use actix_web::{web, HttpResponse};

use crate::app::AppState;

/// Handler for GET /health
///
/// Reports `degraded` with 503 when the session store does not answer.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let (status, mut response) = match state.otp.health().await {
        Ok(()) => ("healthy", HttpResponse::Ok()),
        Err(error) => {
            tracing::warn!(error = %error, "Health check failed");
            ("degraded", HttpResponse::ServiceUnavailable())
        }
    };

    response.json(serde_json::json!({
        "status": status,
        "service": "goauthy-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
