//! Entry lifecycle service.

use std::sync::Arc;

use tracing::{debug, info};

use super::cursor::Cursor;
use super::dispatch::{Dispatcher, LogDispatcher};
use super::store::EntryStore;
use super::types::{Entry, EntryQuery, NewEntry};
use crate::Result;

/// Outcome of sending a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub campaign_id: i64,
    /// Number of entries handed to the dispatcher and then removed.
    pub dispatched: usize,
}

/// Coordinates add, send, delete, get and list over an entry store.
#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn EntryStore>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl EntryService {
    /// Create a service that only logs dispatched campaigns.
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self::with_dispatcher(store, Arc::new(LogDispatcher))
    }

    pub fn with_dispatcher(store: Arc<dyn EntryStore>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<dyn EntryStore> {
        Arc::clone(&self.store)
    }

    /// Store a new entry and return its ID.
    pub async fn add(&self, entry: &NewEntry) -> Result<i64> {
        let id = self.store.insert(entry).await?;
        debug!(id, campaign_id = entry.campaign_id(), "Entry added");
        Ok(id)
    }

    /// Dispatch every entry of a campaign, then remove them.
    ///
    /// When dispatch fails nothing is removed and the error is returned.
    pub async fn send(&self, campaign_id: i64) -> Result<SendReport> {
        let entries = self
            .store
            .query(&EntryQuery::new().with_campaign_id(campaign_id))
            .await?;

        if entries.is_empty() {
            debug!(campaign_id, "Campaign has no entries");
            return Ok(SendReport {
                campaign_id,
                dispatched: 0,
            });
        }

        self.dispatcher.dispatch(campaign_id, &entries).await?;

        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        self.store.batch_delete(&ids).await?;

        info!(campaign_id, count = ids.len(), "Campaign sent");
        Ok(SendReport {
            campaign_id,
            dispatched: ids.len(),
        })
    }

    /// Delete an entry by ID. Missing IDs are not an error.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete(id).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Entry>> {
        self.store.get(id).await
    }

    /// Fetch the page the cursor points at. An empty page ends the listing.
    pub async fn list(&self, cursor: &Cursor) -> Result<Vec<Entry>> {
        self.store.query(&cursor.to_query()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::MemoryEntryStore;
    use crate::MailroomError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingDispatcher;

    #[async_trait]
    impl Dispatcher for FailingDispatcher {
        async fn dispatch(&self, _campaign_id: i64, _entries: &[Entry]) -> Result<()> {
            Err(MailroomError::Dispatch("smtp relay unavailable".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingDispatcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Dispatcher for CountingDispatcher {
        async fn dispatch(&self, _campaign_id: i64, _entries: &[Entry]) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn memory_service() -> EntryService {
        EntryService::new(Arc::new(MemoryEntryStore::new()))
    }

    #[tokio::test]
    async fn test_add_list_send_example() {
        let service = memory_service();

        let id = service
            .add(&NewEntry::new("a@b.com", "t", "c", 1))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let page = service.list(&Cursor::default()).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, 1);

        let report = service.send(1).await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert!(service.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_duplicate() {
        let service = memory_service();
        let entry = NewEntry::new("a@b.com", "t", "c", 1);

        service.add(&entry).await.unwrap();
        let result = service.add(&entry).await;

        assert!(matches!(result, Err(MailroomError::Duplicate)));
        assert_eq!(service.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_send_leaves_other_campaigns() {
        let service = memory_service();
        let a = service.add(&NewEntry::new("a@b.com", "t", "c", 1)).await.unwrap();
        let b = service.add(&NewEntry::new("b@b.com", "t", "c", 2)).await.unwrap();
        let c = service.add(&NewEntry::new("c@b.com", "t", "c", 1)).await.unwrap();

        let report = service.send(1).await.unwrap();
        assert_eq!(report, SendReport { campaign_id: 1, dispatched: 2 });

        assert!(service.get(a).await.unwrap().is_none());
        assert!(service.get(c).await.unwrap().is_none());
        assert!(service.get(b).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_send_dispatch_failure_keeps_entries() {
        let store = Arc::new(MemoryEntryStore::new());
        let service = EntryService::with_dispatcher(store.clone(), Arc::new(FailingDispatcher));
        service.add(&NewEntry::new("a@b.com", "t", "c", 7)).await.unwrap();
        service.add(&NewEntry::new("b@b.com", "t", "c", 7)).await.unwrap();

        let result = service.send(7).await;

        assert!(matches!(result, Err(MailroomError::Dispatch(_))));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_send_empty_campaign_skips_dispatch() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let service = EntryService::with_dispatcher(
            Arc::new(MemoryEntryStore::new()),
            dispatcher.clone(),
        );

        let report = service.send(99).await.unwrap();

        assert_eq!(report.dispatched, 0);
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_chain_visits_every_entry_once() {
        let service = memory_service();
        for i in 0..5 {
            service
                .add(&NewEntry::new(format!("u{i}@b.com"), "t", "c", 1))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = Cursor::new(2);
        loop {
            let page = service.list(&cursor).await.unwrap();
            match cursor.next(&page) {
                Some(next) => {
                    seen.extend(page.iter().map(|e| e.id));
                    cursor = next;
                }
                None => break,
            }
        }

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_delete_idempotent() {
        let service = memory_service();
        let id = service.add(&NewEntry::new("a@b.com", "t", "c", 1)).await.unwrap();

        service.delete(id).await.unwrap();
        service.delete(id).await.unwrap();

        assert!(service.get(id).await.unwrap().is_none());
    }
}
