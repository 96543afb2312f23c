//! CORS middleware configuration.

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use super::auth::TOKEN_HEADER;
use super::request_id::REQUEST_ID_HEADER;
use crate::web::handlers::AFTER_ID_HEADER;

/// Create a CORS layer from configuration.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let exposed = [AFTER_ID_HEADER, REQUEST_ID_HEADER];

    let parsed_origins: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();

    // No (valid) origins configured: allow any origin
    if parsed_origins.is_empty() {
        return CorsLayer::new()
            .allow_methods(methods)
            .allow_headers(Any)
            .allow_origin(Any)
            .expose_headers(exposed);
    }

    CorsLayer::new()
        .allow_methods(methods)
        .allow_headers([TOKEN_HEADER, REQUEST_ID_HEADER, CONTENT_TYPE, ACCEPT])
        .allow_origin(parsed_origins)
        .expose_headers(exposed)
}
