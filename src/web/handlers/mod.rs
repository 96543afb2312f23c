//! API handlers for the mailroom HTTP API.

pub mod entries;

pub use entries::*;

use crate::entry::EntryService;

/// Application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entry lifecycle service.
    pub service: EntryService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: EntryService) -> Self {
        Self { service }
    }
}
