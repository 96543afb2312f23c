//! Storage port for mailing entries.

use async_trait::async_trait;

use super::types::{Entry, EntryQuery, NewEntry};
use crate::Result;

/// Persistence operations the entry lifecycle relies on.
///
/// Every operation is expected to be atomic on its own; callers do no
/// locking of their own around the store.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert an entry and return its assigned ID.
    ///
    /// Fails with `MailroomError::Duplicate` when an entry with the same
    /// recipient, title, content, campaign and insertion time exists.
    async fn insert(&self, entry: &NewEntry) -> Result<i64>;

    /// Get an entry by ID.
    async fn get(&self, id: i64) -> Result<Option<Entry>>;

    /// Delete an entry by ID. Deleting a missing ID succeeds.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Delete all given IDs in one atomic operation. An empty slice is a no-op.
    async fn batch_delete(&self, ids: &[i64]) -> Result<()>;

    /// Query entries in ascending ID order.
    async fn query(&self, params: &EntryQuery) -> Result<Vec<Entry>>;

    /// Count stored entries.
    async fn count(&self) -> Result<i64>;
}
