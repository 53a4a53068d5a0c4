//! External inventory source port.

use async_trait::async_trait;

use crate::domain::ExternalInventoryRecord;

/// One page of records from the external source.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub records: Vec<ExternalInventoryRecord>,
    /// Records on the page that could not be decoded at all. They count as
    /// processed and skipped.
    pub malformed: u32,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Paginated, rate-budgeted upstream holding the authoritative inventory.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Fetch one page of an account's inventory. `cursor` is `None` for the first page.
    async fn fetch_page(
        &self,
        account_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<SourcePage, SourceError>;
}

/// External source errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Timeouts, resets, upstream throttling - worth retrying later.
    #[error("Transient source error: {0}")]
    Transient(String),

    /// Everything retrying will not fix.
    #[error("Source error: {0}")]
    Fatal(String),
}
