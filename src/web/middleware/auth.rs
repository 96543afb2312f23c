//! Static token authentication middleware.

use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::web::error::ApiError;

/// Request header carrying the API token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("x-token");

/// Expected API token.
#[derive(Clone)]
pub struct TokenState {
    token: String,
}

impl TokenState {
    /// Create a new token state.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Check a presented token against the configured one.
    pub fn verify(&self, presented: &str) -> bool {
        !self.token.is_empty() && presented.as_bytes() == self.token.as_bytes()
    }
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState").finish_non_exhaustive()
    }
}

/// Middleware rejecting requests whose `X-Token` header is missing or wrong.
pub async fn token_auth(
    token_state: Arc<TokenState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(&TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if token_state.verify(token) => next.run(request).await,
        Some(_) => {
            tracing::debug!("Rejected request with invalid token");
            ApiError::unauthorized("Invalid token").into_response()
        }
        None => ApiError::unauthorized("Missing X-Token header").into_response(),
    }
}
