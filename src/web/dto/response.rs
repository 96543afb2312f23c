//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entry::{Entry, SendReport};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Cursor page wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryPageResponse {
    /// Entries on this page, in ascending id order.
    pub data: Vec<EntryResponse>,
    /// Cursor metadata.
    pub meta: CursorMeta,
}

/// Cursor metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct CursorMeta {
    /// Page size used for this request.
    pub limit: i64,
    /// Id to pass as `after_id` for the next page; absent on an empty page.
    pub after_id: Option<i64>,
}

// ============================================================================
// Entries
// ============================================================================

/// Stored entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryResponse {
    pub id: i64,
    pub email: String,
    pub title: String,
    pub content: String,
    pub mailing_id: i64,
    pub insert_time: DateTime<Utc>,
}

impl From<&Entry> for EntryResponse {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            email: entry.recipient.clone(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            mailing_id: entry.campaign_id,
            insert_time: entry.inserted_at,
        }
    }
}

/// Created entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct EntryCreatedResponse {
    /// Assigned entry id.
    pub id: i64,
}

/// Result of sending a campaign.
#[derive(Debug, Serialize, ToSchema)]
pub struct SendCampaignResponse {
    pub mailing_id: i64,
    /// Number of entries dispatched and removed.
    pub dispatched: usize,
}

impl From<SendReport> for SendCampaignResponse {
    fn from(report: SendReport) -> Self {
        Self {
            mailing_id: report.campaign_id,
            dispatched: report.dispatched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::NewEntry;
    use chrono::TimeZone;

    #[test]
    fn test_entry_response_wire_names() {
        let entry = NewEntry::new("a@b.com", "t", "c", 4)
            .with_inserted_at(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .into_entry(9);

        let json = serde_json::to_value(ApiResponse::new(EntryResponse::from(&entry))).unwrap();
        assert_eq!(json["data"]["id"], 9);
        assert_eq!(json["data"]["email"], "a@b.com");
        assert_eq!(json["data"]["mailing_id"], 4);
        assert_eq!(json["data"]["insert_time"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_empty_page_meta() {
        let page = EntryPageResponse {
            data: vec![],
            meta: CursorMeta {
                limit: 20,
                after_id: None,
            },
        };
        let json = serde_json::to_value(page).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 0);
        assert!(json["meta"]["after_id"].is_null());
    }
}
