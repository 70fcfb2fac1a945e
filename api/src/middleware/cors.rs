//! CORS configuration for browser clients.
//!
//! Development allows any origin. Staging and production only allow the
//! origins listed in `server.allowed_origins`.

use actix_cors::Cors;
use actix_web::http::{header, Method};

use ga_shared::config::{Environment, ServerConfig};

/// Creates a CORS middleware instance for the given environment.
pub fn create_cors(environment: Environment, server: &ServerConfig) -> Cors {
    if environment.is_development() {
        create_development_cors(server.cors_max_age)
    } else {
        create_restricted_cors(&server.allowed_origins, server.cors_max_age)
    }
}

fn create_development_cors(max_age: usize) -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers(vec![
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::ORIGIN,
            header::USER_AGENT,
            header::HeaderName::from_static("x-request-id"),
        ])
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .max_age(max_age)
}

fn create_restricted_cors(allowed_origins: &[String], max_age: usize) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .max_age(max_age);

    for origin in allowed_origins.iter().map(|s| s.trim()) {
        if !origin.is_empty() {
            tracing::info!(origin, "Adding allowed origin");
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
