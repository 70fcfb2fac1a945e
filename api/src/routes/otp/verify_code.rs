use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::app::AppState;
use crate::dto::{VerifyCodeRequest, VerifyCodeResponse};
use crate::handlers::{handle_domain_error, outcome_error, validation_error};

/// Handler for POST /v1/otp/verify
///
/// # Request Body
///
/// ```json
/// { "session_id": "6f1c2a4e-8d1b-4c55-9a0b-2f0e4f7d9c11", "code": "042817" }
/// ```
///
/// ## Success (200 OK)
/// ```json
/// { "status": "verified", "session_id": "6f1c2a4e-..." }
/// ```
///
/// ## Errors
/// - 401 Unauthorized: wrong code, `details.remaining_attempts` tells how many are left
/// - 410 Gone: session expired or already consumed
/// - 429 Too Many Requests: attempt budget used up
/// - 404 Not Found: unknown session
pub async fn verify_code(
    state: web::Data<AppState>,
    request: web::Json<VerifyCodeRequest>,
) -> HttpResponse {
    if let Err(errors) = request.validate() {
        return validation_error(&errors);
    }

    let cancel = state.shutdown.child_token();
    let outcome = match state
        .otp
        .check_verification(&request.session_id, &request.code, &cancel)
        .await
    {
        Ok(outcome) => outcome,
        Err(error) => return handle_domain_error(&error),
    };

    match outcome_error(outcome) {
        Some(response) => response,
        None => HttpResponse::Ok().json(VerifyCodeResponse {
            status: "verified".to_string(),
            session_id: request.session_id.trim().to_string(),
        }),
    }
}
