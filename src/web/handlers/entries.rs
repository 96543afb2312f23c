//! Entry handlers for Web API.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::entry::Cursor;
use crate::web::dto::{
    ApiResponse, CreateEntryRequest, CursorMeta, CursorQuery, EntryCreatedResponse,
    EntryPageResponse, EntryResponse, SendCampaignRequest, SendCampaignResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Response header carrying the next-page cursor.
pub const AFTER_ID_HEADER: HeaderName = HeaderName::from_static("after_id");

fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid entry id: {raw:?}")))
}

/// POST /clients - Create an entry.
#[utoipa::path(
    post,
    path = "/clients",
    tag = "clients",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = EntryCreatedResponse),
        (status = 400, description = "Malformed JSON"),
        (status = 401, description = "Missing or invalid token"),
        (status = 408, description = "Request timed out"),
        (status = 409, description = "Entry with the same payload exists"),
        (status = 422, description = "Validation error")
    ),
    security(
        ("api_token" = [])
    )
)]
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.service.add(&req.into_new_entry()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(EntryCreatedResponse { id })),
    ))
}

/// POST /clients/send - Dispatch a campaign and remove its entries.
#[utoipa::path(
    post,
    path = "/clients/send",
    tag = "clients",
    request_body = SendCampaignRequest,
    responses(
        (status = 200, description = "Campaign dispatched", body = SendCampaignResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 408, description = "Request timed out"),
        (status = 422, description = "Validation error"),
        (status = 502, description = "Dispatch failed, entries kept")
    ),
    security(
        ("api_token" = [])
    )
)]
pub async fn send_campaign(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<SendCampaignRequest>,
) -> Result<Json<ApiResponse<SendCampaignResponse>>, ApiError> {
    let report = state.service.send(req.mailing_id).await?;
    Ok(Json(ApiResponse::new(report.into())))
}

/// DELETE /clients/:id - Delete an entry.
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "clients",
    params(
        ("id" = i64, Path, description = "Entry ID")
    ),
    responses(
        (status = 204, description = "Entry deleted (or already absent)"),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 408, description = "Request timed out")
    ),
    security(
        ("api_token" = [])
    )
)]
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /clients - List entries with cursor pagination.
#[utoipa::path(
    get,
    path = "/clients",
    tag = "clients",
    params(CursorQuery),
    responses(
        (status = 200, description = "Page of entries", body = EntryPageResponse,
            headers(("after_id" = i64, description = "Last id on this page"))),
        (status = 400, description = "Invalid cursor"),
        (status = 401, description = "Missing or invalid token"),
        (status = 408, description = "Request timed out")
    ),
    security(
        ("api_token" = [])
    )
)]
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CursorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = query
        .to_cursor()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let entries = state.service.list(&cursor).await?;
    let after_id = Cursor::next_hint(&entries);

    let mut headers = HeaderMap::new();
    if let Some(id) = after_id {
        headers.insert(AFTER_ID_HEADER, HeaderValue::from(id));
    }

    let body = EntryPageResponse {
        data: entries.iter().map(EntryResponse::from).collect(),
        meta: CursorMeta {
            limit: cursor.limit,
            after_id,
        },
    };

    Ok((headers, Json(body)))
}

/// GET /clients/:id - Get a single entry.
#[utoipa::path(
    get,
    path = "/clients/{id}",
    tag = "clients",
    params(
        ("id" = i64, Path, description = "Entry ID")
    ),
    responses(
        (status = 200, description = "Entry", body = EntryResponse),
        (status = 400, description = "Invalid id"),
        (status = 401, description = "Missing or invalid token"),
        (status = 408, description = "Request timed out"),
        (status = 404, description = "Entry not found")
    ),
    security(
        ("api_token" = [])
    )
)]
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<EntryResponse>>, ApiError> {
    let id = parse_id(&id)?;
    let entry = state
        .service
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Entry {id} not found")))?;

    Ok(Json(ApiResponse::new(EntryResponse::from(&entry))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }
}
