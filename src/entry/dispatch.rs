//! Campaign delivery port.

use async_trait::async_trait;
use tracing::{debug, info};

use super::types::Entry;
use crate::Result;

/// Delivers the entries of a campaign.
///
/// `send` calls this before removing anything, so an error here leaves the
/// campaign intact.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, campaign_id: i64, entries: &[Entry]) -> Result<()>;
}

/// Dispatcher that only records the delivery in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    async fn dispatch(&self, campaign_id: i64, entries: &[Entry]) -> Result<()> {
        info!(campaign_id, count = entries.len(), "Dispatching campaign");
        for entry in entries {
            debug!(campaign_id, id = entry.id, recipient = %entry.recipient, "Dispatched entry");
        }
        Ok(())
    }
}
