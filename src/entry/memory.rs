//! In-memory entry store.
//!
//! Used by service and watcher tests, and anywhere a throwaway store is
//! enough. Each operation holds a single mutex for its whole duration.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::store::EntryStore;
use super::types::{Entry, EntryQuery, NewEntry};
use crate::{MailroomError, Result};

#[derive(Debug)]
struct Inner {
    next_id: i64,
    entries: BTreeMap<i64, Entry>,
}

/// Entry store backed by an ordered map.
#[derive(Debug)]
pub struct MemoryEntryStore {
    inner: Mutex<Inner>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                entries: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryEntryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn insert(&self, entry: &NewEntry) -> Result<i64> {
        let mut inner = self.inner.lock().await;
        if inner.entries.values().any(|e| entry.is_same_payload(e)) {
            return Err(MailroomError::Duplicate);
        }

        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(id, entry.clone().into_entry(id));
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<Entry>> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.inner.lock().await.entries.remove(&id);
        Ok(())
    }

    async fn batch_delete(&self, ids: &[i64]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for id in ids {
            inner.entries.remove(id);
        }
        Ok(())
    }

    async fn query(&self, params: &EntryQuery) -> Result<Vec<Entry>> {
        let inner = self.inner.lock().await;
        let matching = inner.entries.values().filter(|e| params.matches(e)).cloned();

        let entries = match params.limit {
            Some(limit) => matching.take(usize::try_from(limit).unwrap_or(0)).collect(),
            None => matching.collect(),
        };
        Ok(entries)
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.inner.lock().await.entries.len() as i64)
    }
}
