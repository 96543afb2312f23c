//! Entry types for mailroom.

use chrono::{DateTime, SubsecRound, Utc};

/// Timestamps are kept at microsecond precision so every backend compares
/// them the same way.
const TIMESTAMP_PRECISION: u16 = 6;

/// A stored mailing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Entry ID, increasing with insertion order.
    pub id: i64,
    /// Recipient email address.
    pub recipient: String,
    /// Message subject.
    pub title: String,
    /// Message body.
    pub content: String,
    /// Campaign (mailing) this entry belongs to.
    pub campaign_id: i64,
    /// When the entry was inserted.
    pub inserted_at: DateTime<Utc>,
}

/// New entry for creation.
///
/// Fields are read through accessors so the insertion timestamp always
/// stays truncated to the stored precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    recipient: String,
    title: String,
    content: String,
    campaign_id: i64,
    inserted_at: DateTime<Utc>,
}

impl NewEntry {
    /// Create a new entry stamped with the current time.
    pub fn new(
        recipient: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        campaign_id: i64,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            title: title.into(),
            content: content.into(),
            campaign_id,
            inserted_at: Utc::now().trunc_subsecs(TIMESTAMP_PRECISION),
        }
    }

    /// Set an explicit insertion timestamp.
    pub fn with_inserted_at(mut self, inserted_at: DateTime<Utc>) -> Self {
        self.inserted_at = inserted_at.trunc_subsecs(TIMESTAMP_PRECISION);
        self
    }

    /// Recipient email address.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Message subject.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Message body.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Campaign (mailing) ID.
    pub fn campaign_id(&self) -> i64 {
        self.campaign_id
    }

    /// Insertion timestamp, truncated to microseconds.
    pub fn inserted_at(&self) -> DateTime<Utc> {
        self.inserted_at
    }

    /// Whether `entry` carries the same payload tuple as this one.
    pub fn is_same_payload(&self, entry: &Entry) -> bool {
        self.recipient == entry.recipient
            && self.title == entry.title
            && self.content == entry.content
            && self.campaign_id == entry.campaign_id
            && self.inserted_at == entry.inserted_at
    }

    /// Build the stored entry once an ID has been assigned.
    pub fn into_entry(self, id: i64) -> Entry {
        Entry {
            id,
            recipient: self.recipient,
            title: self.title,
            content: self.content,
            campaign_id: self.campaign_id,
            inserted_at: self.inserted_at,
        }
    }
}

/// Filter for entry queries.
///
/// All set filters are combined with AND. Results are always ordered by
/// ascending ID. An empty query matches every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Only entries of this campaign.
    pub campaign_id: Option<i64>,
    /// Only entries inserted strictly before this instant.
    pub inserted_before: Option<DateTime<Utc>>,
    /// Only entries with an ID strictly greater than this one.
    pub id_greater_than: Option<i64>,
    /// Maximum number of entries to return.
    pub limit: Option<i64>,
}

impl EntryQuery {
    /// Create a query matching all entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by campaign.
    pub fn with_campaign_id(mut self, campaign_id: i64) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    /// Filter by insertion time.
    pub fn with_inserted_before(mut self, threshold: DateTime<Utc>) -> Self {
        self.inserted_before = Some(threshold);
        self
    }

    /// Start after the given ID.
    pub fn with_id_greater_than(mut self, id: i64) -> Self {
        self.id_greater_than = Some(id);
        self
    }

    /// Cap the number of results.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check the filters (not the limit) against an entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        self.campaign_id.map_or(true, |c| entry.campaign_id == c)
            && self.inserted_before.map_or(true, |t| entry.inserted_at < t)
            && self.id_greater_than.map_or(true, |id| entry.id > id)
    }
}
