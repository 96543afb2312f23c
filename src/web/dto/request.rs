//! Request DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};
use crate::entry::{Cursor, CursorError, NewEntry};

/// Create entry request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEntryRequest {
    /// Recipient email address.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    /// Message subject.
    #[validate(
        length(min = 1, message = "Must not be empty"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub title: String,
    /// Message body.
    #[validate(
        length(min = 1, message = "Must not be empty"),
        custom(function = "not_empty_trimmed")
    )]
    pub content: String,
    /// Campaign the entry belongs to.
    #[validate(range(min = 1, message = "Must be a positive campaign id"))]
    pub mailing_id: i64,
    /// Insertion time; the server clock is used when omitted.
    #[serde(default)]
    pub insert_time: Option<DateTime<Utc>>,
}

impl CreateEntryRequest {
    /// Convert into a storable entry.
    pub fn into_new_entry(self) -> NewEntry {
        let entry = NewEntry::new(self.email, self.title, self.content, self.mailing_id);
        match self.insert_time {
            Some(at) => entry.with_inserted_at(at),
            None => entry,
        }
    }
}

/// Send campaign request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendCampaignRequest {
    /// Campaign to dispatch.
    #[validate(range(min = 1, message = "Must be a positive campaign id"))]
    pub mailing_id: i64,
}

/// Cursor pagination query parameters.
///
/// Kept as raw strings so malformed numbers surface as a cursor error
/// instead of a generic query rejection.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CursorQuery {
    /// Page size (default 20).
    pub limit: Option<String>,
    /// Last id seen on the previous page.
    pub after_id: Option<String>,
}

impl CursorQuery {
    pub fn to_cursor(&self) -> Result<Cursor, CursorError> {
        Cursor::parse(self.limit.as_deref(), self.after_id.as_deref())
    }
}
