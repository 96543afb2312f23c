//! Cursor pagination for entry listing.

use thiserror::Error;

use super::types::{Entry, EntryQuery};

/// Page size used when the client does not ask for one.
pub const DEFAULT_LIMIT: i64 = 20;

/// Errors produced while decoding a pagination request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// `limit` is present but not an integer.
    #[error("invalid limit: {0:?}")]
    InvalidLimit(String),

    /// `after_id` is present but not an integer.
    #[error("invalid after_id: {0:?}")]
    InvalidAfterId(String),

    /// `limit` is zero or negative.
    #[error("limit must be positive, got {0}")]
    NonPositiveLimit(i64),
}

/// Client-side pagination state: page size plus the last ID already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub limit: i64,
    pub after_id: Option<i64>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            after_id: None,
        }
    }
}

impl Cursor {
    /// First page with the given size.
    pub fn new(limit: i64) -> Self {
        Self {
            limit,
            after_id: None,
        }
    }

    /// Continue after the given ID.
    pub fn after(mut self, after_id: i64) -> Self {
        self.after_id = Some(after_id);
        self
    }

    /// Decode raw query-string values. Empty strings count as absent;
    /// any other value must be a bare integer with no surrounding whitespace.
    pub fn parse(limit: Option<&str>, after_id: Option<&str>) -> Result<Self, CursorError> {
        let limit = match non_empty(limit) {
            Some(raw) => {
                let value: i64 = raw
                    .parse()
                    .map_err(|_| CursorError::InvalidLimit(raw.to_string()))?;
                if value <= 0 {
                    return Err(CursorError::NonPositiveLimit(value));
                }
                value
            }
            None => DEFAULT_LIMIT,
        };

        let after_id = non_empty(after_id)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| CursorError::InvalidAfterId(raw.to_string()))
            })
            .transpose()?;

        Ok(Self { limit, after_id })
    }

    /// Store query for the page this cursor points at.
    pub fn to_query(&self) -> EntryQuery {
        let query = EntryQuery::new().with_limit(self.limit);
        match self.after_id {
            Some(id) => query.with_id_greater_than(id),
            None => query,
        }
    }

    /// ID to continue from after `page`; `None` for an empty page.
    pub fn next_hint(page: &[Entry]) -> Option<i64> {
        page.last().map(|e| e.id)
    }

    /// Cursor for the page following `page`, or `None` at end of collection.
    pub fn next(&self, page: &[Entry]) -> Option<Cursor> {
        Self::next_hint(page).map(|id| Cursor::new(self.limit).after(id))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
