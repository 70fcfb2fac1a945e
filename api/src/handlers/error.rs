//! Mapping from domain results to HTTP responses
//!
//! Provider and store details are logged, never returned: clients only ever
//! see the fixed error codes from `ga_shared::error_codes`.

use actix_web::{
    error::{InternalError, JsonPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse,
};
use validator::ValidationErrors;

use ga_core::domain::VerificationOutcome;
use ga_core::errors::DomainError;
use ga_shared::{error_codes, ErrorResponse};

/// Response for a domain error raised by send or verify
pub fn handle_domain_error(error: &DomainError) -> HttpResponse {
    let (status, code, message) = match error {
        DomainError::Validation { message } => (
            StatusCode::BAD_REQUEST,
            error_codes::VALIDATION_ERROR,
            message.clone(),
        ),
        DomainError::SessionNotFound { .. } => (
            StatusCode::NOT_FOUND,
            error_codes::SESSION_NOT_FOUND,
            "Verification session not found".to_string(),
        ),
        DomainError::AllChannelsFailed => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::DELIVERY_UNAVAILABLE,
            "Unable to deliver a verification code right now. Please try again later.".to_string(),
        ),
        DomainError::Cancelled => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            "Service is shutting down. Please retry.".to_string(),
        ),
        DomainError::Store(_) | DomainError::InvalidStrategy { .. } | DomainError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "An internal error occurred".to_string(),
        ),
    };

    if status.is_server_error() {
        tracing::error!(error = %error, status = status.as_u16(), "Request failed");
    } else {
        tracing::debug!(error = %error, status = status.as_u16(), "Request rejected");
    }

    HttpResponse::build(status).json(ErrorResponse::new(code, message))
}

/// Response for a non-success verification outcome
///
/// Returns `None` for `Success`, which the route renders itself.
pub fn outcome_error(outcome: VerificationOutcome) -> Option<HttpResponse> {
    let response = match outcome {
        VerificationOutcome::Success => return None,
        VerificationOutcome::Mismatch { remaining_attempts } => HttpResponse::Unauthorized().json(
            ErrorResponse::new(error_codes::CODE_MISMATCH, "The code is incorrect")
                .add_detail("remaining_attempts", remaining_attempts),
        ),
        VerificationOutcome::Expired => HttpResponse::Gone().json(ErrorResponse::new(
            error_codes::CODE_EXPIRED,
            "The code has expired. Request a new one.",
        )),
        VerificationOutcome::TooManyAttempts => HttpResponse::TooManyRequests().json(
            ErrorResponse::new(
                error_codes::TOO_MANY_ATTEMPTS,
                "Too many attempts. Request a new code.",
            ),
        ),
        VerificationOutcome::NotFound => HttpResponse::NotFound().json(ErrorResponse::new(
            error_codes::SESSION_NOT_FOUND,
            "Verification session not found",
        )),
    };
    Some(response)
}

/// 400 response listing the offending fields
pub fn validation_error(errors: &ValidationErrors) -> HttpResponse {
    let fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();

    HttpResponse::BadRequest().json(
        ErrorResponse::new(error_codes::VALIDATION_ERROR, "Invalid request data")
            .add_detail("fields", fields)
            .add_detail("validation_errors", errors),
    )
}

/// Render malformed JSON bodies with the standard error body
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::new(
        error_codes::VALIDATION_ERROR,
        format!("Malformed request body: {}", err),
    ));
    InternalError::from_response(err, response).into()
}
