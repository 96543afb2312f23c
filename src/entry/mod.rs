//! Mailing entry module for mailroom.
//!
//! This module provides the entry lifecycle:
//! - Storage port and its SQL and in-memory implementations
//! - Add / send / delete / get / list orchestration
//! - Cursor pagination
//! - Background retention sweeping of stale entries

mod cursor;
mod dispatch;
mod memory;
mod repository;
mod service;
mod store;
mod types;
mod watcher;

pub use cursor::{Cursor, CursorError, DEFAULT_LIMIT};
pub use dispatch::{Dispatcher, LogDispatcher};
pub use memory::MemoryEntryStore;
pub use repository::EntryRepository;
pub use service::{EntryService, SendReport};
pub use store::EntryStore;
pub use types::{Entry, EntryQuery, NewEntry};
pub use watcher::{
    sweep_stale, RetentionWatcher, WatcherState, DEFAULT_RETENTION_TTL_SECS,
    DEFAULT_TICK_PERIOD_SECS,
};
