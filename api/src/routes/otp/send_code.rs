use actix_web::{web, HttpResponse};
use validator::Validate;

use ga_shared::phone::mask_phone_number;

use crate::app::AppState;
use crate::dto::{SendCodeRequest, SendCodeResponse};
use crate::handlers::{handle_domain_error, validation_error};

/// Handler for POST /v1/otp/send
///
/// Starts a verification session and delivers the first code.
///
/// # Request Body
///
/// ```json
/// { "to": "+15551234567" }
/// ```
///
/// # Response
///
/// ## Success (200 OK)
/// ```json
/// {
///     "session_id": "6f1c2a4e-8d1b-4c55-9a0b-2f0e4f7d9c11",
///     "channel": "sms",
///     "destination": "+1******4567",
///     "expires_at": "2024-05-01T12:05:00Z"
/// }
/// ```
///
/// ## Errors
/// - 400 Bad Request: destination is not an international phone number
/// - 503 Service Unavailable: no channel could deliver the code
/// - 500 Internal Server Error: session store failure
pub async fn send_code(
    state: web::Data<AppState>,
    request: web::Json<SendCodeRequest>,
) -> HttpResponse {
    if let Err(errors) = request.validate() {
        return validation_error(&errors);
    }

    tracing::info!(destination = %mask_phone_number(&request.to), "Processing send request");

    let cancel = state.shutdown.child_token();
    match state.otp.send_verification(&request.to, &cancel).await {
        Ok(summary) => HttpResponse::Ok().json(SendCodeResponse::from(summary)),
        Err(error) => handle_domain_error(&error),
    }
}
