//! Middleware for Web API.

pub mod auth;
pub mod cors;
pub mod request_id;

pub use auth::{token_auth, TokenState, TOKEN_HEADER};
pub use cors::create_cors_layer;
pub use request_id::{request_id, REQUEST_ID_HEADER};
