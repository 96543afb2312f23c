//! mailroom - mailing entry store
//!
//! Stores mailing entries grouped by campaign, dispatches and purges whole
//! campaigns on request, and evicts entries older than a retention window
//! in the background.

pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use entry::{
    Cursor, CursorError, Dispatcher, Entry, EntryQuery, EntryRepository, EntryService,
    EntryStore, LogDispatcher, MemoryEntryStore, NewEntry, RetentionWatcher, SendReport,
    WatcherState,
};
pub use error::{MailroomError, Result};
