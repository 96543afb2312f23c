//! Web API module for mailroom.
//!
//! This module provides the REST API over the entry lifecycle service:
//! routing, request decoding, token authentication and status mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::{create_app, create_router, ApiDoc};
pub use server::WebServer;
