use async_trait::async_trait;

use super::{Condition, Item, ScanPage, StoreResult, TableDescriptor, TableStatus, UpdateSpec};

/// The abstract key-value store consumed by the client and lifecycle manager.
///
/// Implementations must be safe for concurrent use and must classify every
/// failure with an [`ErrorCode`](super::ErrorCode).
#[async_trait]
pub trait Store: Send + Sync {
    /// Issues a table creation request.
    async fn create_table(&self, descriptor: &TableDescriptor) -> StoreResult<()>;

    /// Returns the current status; a missing table is `TableStatus::Absent`.
    async fn describe_table(&self, table: &str) -> StoreResult<TableStatus>;

    /// Drops a table.
    async fn delete_table(&self, table: &str) -> StoreResult<()>;

    /// Reads one item by its full key.
    async fn get_item(&self, table: &str, key: &Item) -> StoreResult<Option<Item>>;

    /// Writes one item, replacing any existing item with the same key.
    async fn put_item(
        &self,
        table: &str,
        item: &Item,
        condition: Option<&Condition>,
    ) -> StoreResult<()>;

    /// Applies a partial update, returning attributes per `update.return_values`.
    async fn update_item(
        &self,
        table: &str,
        key: &Item,
        update: &UpdateSpec,
    ) -> StoreResult<Option<Item>>;

    /// Reads one page of the table starting after `cursor`.
    async fn scan(
        &self,
        table: &str,
        page_size: usize,
        cursor: Option<&Item>,
    ) -> StoreResult<ScanPage>;

    /// Deletes a batch of items by key.
    async fn batch_delete(&self, table: &str, keys: &[Item]) -> StoreResult<()>;
}
