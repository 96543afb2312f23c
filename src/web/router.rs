//! Router configuration for Web API.

use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    CreateEntryRequest, CursorMeta, EntryCreatedResponse, EntryPageResponse, EntryResponse,
    SendCampaignRequest, SendCampaignResponse,
};
use super::handlers::{
    self, create_entry, delete_entry, get_entry, list_entries, send_campaign, AppState,
};
use super::middleware::{create_cors_layer, request_id, token_auth, TokenState};
use crate::config::WebConfig;

/// OpenAPI document for the entry API.
#[derive(OpenApi)]
#[openapi(
    info(title = "mailroom", description = "Mailing entry store API"),
    paths(
        handlers::entries::create_entry,
        handlers::entries::send_campaign,
        handlers::entries::delete_entry,
        handlers::entries::list_entries,
        handlers::entries::get_entry,
    ),
    components(schemas(
        CreateEntryRequest,
        SendCampaignRequest,
        EntryResponse,
        EntryCreatedResponse,
        EntryPageResponse,
        CursorMeta,
        SendCampaignResponse,
    )),
    modifiers(&TokenSecurity),
    tags((name = "clients", description = "Mailing entries"))
)]
pub struct ApiDoc;

struct TokenSecurity;

impl Modify for TokenSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Token"))),
            );
        }
    }
}

/// Create the entry API router. Every route requires a valid `X-Token`.
pub fn create_router(app_state: Arc<AppState>, web_config: &WebConfig) -> Router {
    let token_state = Arc::new(TokenState::new(web_config.api_token.clone()));

    Router::new()
        .route("/clients", post(create_entry).get(list_entries))
        .route("/clients/send", post(send_campaign))
        .route("/clients/:id", get(get_entry).delete(delete_entry))
        .route_layer(middleware::from_fn(move |req, next| {
            let state = token_state.clone();
            token_auth(state, req, next)
        }))
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create the router serving the OpenAPI document.
pub fn create_openapi_router() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

/// Build the complete application: entry API, health and OpenAPI routes,
/// with request id, tracing and CORS layers applied to all of them.
pub fn create_app(app_state: Arc<AppState>, web_config: &WebConfig) -> Router {
    create_router(app_state, web_config)
        .merge(create_health_router())
        .merge(create_openapi_router())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id))
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(&web_config.cors_origins)),
        )
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_health_router() {
        let _router = create_health_router();
        // Should not panic
    }

    #[test]
    fn test_openapi_document() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["paths"]["/clients"]["post"].is_object());
        assert!(json["paths"]["/clients"]["get"].is_object());
        assert!(json["paths"]["/clients/send"]["post"].is_object());
        assert!(json["paths"]["/clients/{id}"]["get"].is_object());
        assert!(json["paths"]["/clients/{id}"]["delete"].is_object());
        assert!(json["components"]["securitySchemes"]["api_token"].is_object());
    }
}
