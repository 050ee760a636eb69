//! Storage traits
//!
//! This module defines the narrow interfaces the pipeline needs from a
//! relational engine.

use crate::fetcher::PageDocument;
use crate::jobs::JobStatus;
use crate::storage::{CursorKey, SourceRow, StoreResult};
use async_trait::async_trait;

/// Read side of a polled source
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Lists user tables
    async fn list_tables(&self) -> StoreResult<Vec<String>>;

    /// Lists the columns of a table in declaration order
    async fn list_columns(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Fetches rows with `id > after_id`, ascending by id, at most `limit`
    ///
    /// # Arguments
    ///
    /// * `table` - Source table
    /// * `column` - Column holding the URL
    /// * `after_id` - Exclusive lower bound on the row id
    /// * `limit` - Maximum number of rows
    async fn fetch_rows(
        &self,
        table: &str,
        column: &str,
        after_id: i64,
        limit: u32,
    ) -> StoreResult<Vec<SourceRow>>;
}

/// Write side receiving job results
#[async_trait]
pub trait SinkStore: Send + Sync {
    /// Creates the output table if absent; safe to call repeatedly
    async fn ensure_table(&self, name: &str) -> StoreResult<()>;

    /// Inserts one result row
    async fn insert_result(
        &self,
        name: &str,
        job_id: u64,
        url: &str,
        document: &PageDocument,
        status: JobStatus,
    ) -> StoreResult<()>;
}

/// Persistence for source cursors
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Loads the stored cursor, if any
    async fn load_cursor(&self, key: &CursorKey) -> StoreResult<Option<i64>>;

    /// Stores a cursor value; a lower value never replaces a higher one
    async fn save_cursor(&self, key: &CursorKey, last_seen_id: i64) -> StoreResult<()>;
}
