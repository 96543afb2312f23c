//! Retention watcher for mailroom.
//!
//! This module provides a background task that periodically removes entries
//! older than the retention window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::store::EntryStore;
use super::types::EntryQuery;
use crate::Result;

/// Default time between sweeps in seconds.
pub const DEFAULT_TICK_PERIOD_SECS: u64 = 60;

/// Default retention window in seconds (5 minutes).
pub const DEFAULT_RETENTION_TTL_SECS: u64 = 300;

/// Lifecycle state of the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Running,
    Stopped,
}

struct RunningLoop {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Background evictor of stale entries.
///
/// Each tick runs one sweep: entries inserted more than `ttl` ago are
/// collected and removed with a single batch delete. Sweep failures are
/// logged and the loop carries on with the next tick.
pub struct RetentionWatcher {
    store: Arc<dyn EntryStore>,
    tick_period: Duration,
    ttl: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl RetentionWatcher {
    /// Create a stopped watcher.
    ///
    /// A zero tick period falls back to `DEFAULT_TICK_PERIOD_SECS`.
    pub fn new(store: Arc<dyn EntryStore>, tick_period: Duration, ttl: Duration) -> Self {
        let tick_period = if tick_period.is_zero() {
            warn!(
                "Retention watcher tick period is zero, using {}s",
                DEFAULT_TICK_PERIOD_SECS
            );
            Duration::from_secs(DEFAULT_TICK_PERIOD_SECS)
        } else {
            tick_period
        };

        Self {
            store,
            tick_period,
            ttl,
            running: Mutex::new(None),
        }
    }

    /// Spawn the sweep loop. The first sweep runs one tick period from now.
    ///
    /// Returns `false` without spawning anything if the loop is already
    /// running. A loop whose task has died is reaped and respawned.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        match running.take() {
            Some(current) if !current.handle.is_finished() => {
                *running = Some(current);
                warn!("Retention watcher already running");
                return false;
            }
            Some(dead) => match dead.handle.await {
                Err(e) => error!("Retention watcher task died: {}", e),
                Ok(()) => warn!("Retention watcher task had exited, restarting"),
            },
            None => {}
        }

        let (shutdown, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.store),
            self.tick_period,
            self.ttl,
            shutdown_rx,
        ));
        *running = Some(RunningLoop { shutdown, handle });

        info!(
            "Retention watcher started (tick: {}s, ttl: {}s)",
            self.tick_period.as_secs(),
            self.ttl.as_secs()
        );
        true
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// A sweep that is already executing finishes first. Calling this on a
    /// stopped watcher returns immediately.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(RunningLoop { shutdown, handle }) = running.take() else {
            return;
        };

        // The receiver is gone only if the task already ended.
        let _ = shutdown.send(());
        if let Err(e) = handle.await {
            error!("Retention watcher task failed: {}", e);
        }
        info!("Retention watcher stopped");
    }

    pub async fn state(&self) -> WatcherState {
        match self.running.lock().await.as_ref() {
            Some(running) if !running.handle.is_finished() => WatcherState::Running,
            _ => WatcherState::Stopped,
        }
    }

    /// Run one sweep against the current time.
    pub async fn sweep(&self) -> Result<usize> {
        self.sweep_at(Utc::now()).await
    }

    /// Run one sweep as if the clock read `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize> {
        sweep_once(self.store.as_ref(), self.ttl, now).await
    }
}

/// Remove every entry inserted strictly before `cutoff`.
///
/// Returns the number of entries removed. Nothing is deleted (and the store
/// sees no delete call) when no entry is stale.
pub async fn sweep_stale(store: &dyn EntryStore, cutoff: DateTime<Utc>) -> Result<usize> {
    let stale = store
        .query(&EntryQuery::new().with_inserted_before(cutoff))
        .await?;
    if stale.is_empty() {
        return Ok(0);
    }

    let ids: Vec<i64> = stale.iter().map(|e| e.id).collect();
    store.batch_delete(&ids).await?;
    Ok(ids.len())
}

async fn sweep_once(store: &dyn EntryStore, ttl: Duration, now: DateTime<Utc>) -> Result<usize> {
    let cutoff = chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_sub_signed(ttl));
    match cutoff {
        Some(cutoff) => sweep_stale(store, cutoff).await,
        None => Ok(0),
    }
}

async fn run_loop(
    store: Arc<dyn EntryStore>,
    tick_period: Duration,
    ttl: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut timer = interval(tick_period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    timer.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = timer.tick() => {
                match sweep_once(store.as_ref(), ttl, Utc::now()).await {
                    Ok(0) => debug!("Retention sweep: nothing stale"),
                    Ok(n) => info!("Retention sweep removed {} stale entries", n),
                    Err(e) => error!("Retention sweep failed: {}", e),
                }
            }
        }
    }

    debug!("Retention watcher loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, MemoryEntryStore, NewEntry};
    use crate::MailroomError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(DEFAULT_RETENTION_TTL_SECS);

    /// Store wrapper counting calls and optionally failing or blocking.
    #[derive(Default)]
    struct InstrumentedStore {
        inner: MemoryEntryStore,
        queries: AtomicUsize,
        deletes: AtomicUsize,
        fail_first_query: AtomicBool,
        panic_first_query: AtomicBool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
        gate_used: AtomicBool,
    }

    #[async_trait]
    impl EntryStore for InstrumentedStore {
        async fn insert(&self, entry: &NewEntry) -> Result<i64> {
            self.inner.insert(entry).await
        }

        async fn get(&self, id: i64) -> Result<Option<Entry>> {
            self.inner.get(id).await
        }

        async fn delete(&self, id: i64) -> Result<()> {
            self.inner.delete(id).await
        }

        async fn batch_delete(&self, ids: &[i64]) -> Result<()> {
            if let Some((entered, release)) = &self.gate {
                if !self.gate_used.swap(true, Ordering::SeqCst) {
                    entered.notify_one();
                    release.notified().await;
                }
            }
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.batch_delete(ids).await
        }

        async fn query(&self, params: &EntryQuery) -> Result<Vec<Entry>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if self.panic_first_query.swap(false, Ordering::SeqCst) {
                panic!("store connection poisoned");
            }
            if self.fail_first_query.swap(false, Ordering::SeqCst) {
                return Err(MailroomError::Database("connection reset".to_string()));
            }
            self.inner.query(params).await
        }

        async fn count(&self) -> Result<i64> {
            self.inner.count().await
        }
    }

    fn entry_at(recipient: &str, at: DateTime<Utc>) -> NewEntry {
        NewEntry::new(recipient, "t", "c", 1).with_inserted_at(at)
    }

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_sweep_at_removes_only_stale() {
        let store = Arc::new(MemoryEntryStore::new());
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        store
            .insert(&entry_at("old@x.com", t - chrono::Duration::minutes(10)))
            .await
            .unwrap();
        let fresh = store
            .insert(&entry_at("new@x.com", t - chrono::Duration::minutes(1)))
            .await
            .unwrap();

        let watcher = RetentionWatcher::new(store.clone(), Duration::from_secs(60), TTL);
        assert_eq!(watcher.sweep_at(t).await.unwrap(), 1);

        let rest = store.query(&EntryQuery::new()).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, fresh);
    }

    #[tokio::test]
    async fn test_sweep_without_stale_entries_skips_delete() {
        let store = Arc::new(InstrumentedStore::default());
        store.insert(&entry_at("new@x.com", Utc::now())).await.unwrap();

        let watcher = RetentionWatcher::new(store.clone(), Duration::from_secs(60), TTL);
        assert_eq!(watcher.sweep().await.unwrap(), 0);

        assert_eq!(store.queries.load(Ordering::SeqCst), 1);
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_start_twice_and_stop_twice() {
        let store = Arc::new(MemoryEntryStore::new());
        let watcher = RetentionWatcher::new(store, Duration::from_secs(60), TTL);
        assert_eq!(watcher.state().await, WatcherState::Stopped);

        assert!(watcher.start().await);
        assert!(!watcher.start().await);
        assert_eq!(watcher.state().await, WatcherState::Running);

        watcher.stop().await;
        watcher.stop().await;
        assert_eq!(watcher.state().await, WatcherState::Stopped);

        // Restart after stop
        assert!(watcher.start().await);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_loop_sweeps_on_tick() {
        let store = Arc::new(InstrumentedStore::default());
        store
            .insert(&entry_at("old@x.com", Utc::now() - chrono::Duration::minutes(10)))
            .await
            .unwrap();
        store.insert(&entry_at("new@x.com", Utc::now())).await.unwrap();

        let watcher = RetentionWatcher::new(store.clone(), Duration::from_millis(20), TTL);
        watcher.start().await;

        let observed = store.clone();
        wait_until(move || observed.deletes.load(Ordering::SeqCst) >= 1).await;
        watcher.stop().await;

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_sweep_keeps_loop_running() {
        let store = Arc::new(InstrumentedStore {
            fail_first_query: AtomicBool::new(true),
            ..InstrumentedStore::default()
        });
        store
            .insert(&entry_at("old@x.com", Utc::now() - chrono::Duration::minutes(10)))
            .await
            .unwrap();

        let watcher = RetentionWatcher::new(store.clone(), Duration::from_millis(20), TTL);
        watcher.start().await;

        let observed = store.clone();
        wait_until(move || observed.deletes.load(Ordering::SeqCst) >= 1).await;
        watcher.stop().await;

        assert!(store.queries.load(Ordering::SeqCst) >= 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_sweep() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = Arc::new(InstrumentedStore {
            gate: Some((entered.clone(), release.clone())),
            ..InstrumentedStore::default()
        });
        store
            .insert(&entry_at("old@x.com", Utc::now() - chrono::Duration::minutes(10)))
            .await
            .unwrap();

        let watcher = Arc::new(RetentionWatcher::new(
            store.clone(),
            Duration::from_millis(20),
            TTL,
        ));
        watcher.start().await;
        entered.notified().await;

        let stopper = {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.stop().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!stopper.is_finished());

        release.notify_one();
        stopper.await.unwrap();

        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(store.count().await.unwrap(), 0);

        // No sweep after stop returned
        let queries = store.queries.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.queries.load(Ordering::SeqCst), queries);
        assert_eq!(watcher.state().await, WatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_zero_tick_period_uses_default() {
        let store = Arc::new(MemoryEntryStore::new());
        let watcher = RetentionWatcher::new(store, Duration::ZERO, TTL);
        assert_eq!(
            watcher.tick_period,
            Duration::from_secs(DEFAULT_TICK_PERIOD_SECS)
        );

        assert!(watcher.start().await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(watcher.state().await, WatcherState::Running);
        watcher.stop().await;
    }

    #[tokio::test]
    async fn test_start_respawns_dead_loop() {
        let store = Arc::new(InstrumentedStore {
            panic_first_query: AtomicBool::new(true),
            ..InstrumentedStore::default()
        });
        store
            .insert(&entry_at("old@x.com", Utc::now() - chrono::Duration::minutes(10)))
            .await
            .unwrap();

        let watcher = RetentionWatcher::new(store.clone(), Duration::from_millis(20), TTL);
        assert!(watcher.start().await);

        tokio::time::timeout(Duration::from_secs(5), async {
            while watcher.state().await == WatcherState::Running {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop did not die");
        assert_eq!(store.count().await.unwrap(), 1);

        // The dead loop is reaped and a fresh one sweeps
        assert!(watcher.start().await);
        assert_eq!(watcher.state().await, WatcherState::Running);

        let observed = store.clone();
        wait_until(move || observed.deletes.load(Ordering::SeqCst) >= 1).await;
        watcher.stop().await;
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
