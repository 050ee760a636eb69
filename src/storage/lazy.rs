//! Lazily connected source store
//!
//! A [`LazyStore`] opens the configured store on first use and again after the
//! engine reports the connection as gone. A failed open is returned to the
//! caller like any other store error, so a source that is down at startup is
//! simply retried on the next poll.

use crate::config::SourceConfig;
use crate::fetcher::PageDocument;
use crate::jobs::JobStatus;
use crate::storage::traits::{CursorStore, SinkStore, SourceStore};
use crate::storage::{open_store, CursorKey, SourceRow, StoreError, StoreHandle, StoreResult};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Store for one configured source that connects on demand
pub struct LazyStore {
    config: SourceConfig,
    handle: Mutex<Option<StoreHandle>>,
}

impl LazyStore {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
        }
    }

    /// Whether a connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    async fn connect(&self) -> StoreResult<StoreHandle> {
        let mut handle = self.handle.lock().await;
        if let Some(existing) = handle.as_ref() {
            return Ok(existing.clone());
        }

        let opened = open_store(&self.config).await?;
        info!("Source '{}' connected", self.config.name);
        *handle = Some(opened.clone());
        Ok(opened)
    }

    /// Drops the cached connection when the engine reports it unusable
    async fn track<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        if let Err(StoreError::Unavailable(reason)) = &result {
            warn!(
                "Source '{}' lost its connection, reconnecting on next use: {}",
                self.config.name, reason
            );
            self.handle.lock().await.take();
        }
        result
    }
}

#[async_trait]
impl SourceStore for LazyStore {
    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let handle = self.connect().await?;
        let result = handle.source.list_tables().await;
        self.track(result).await
    }

    async fn list_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        let handle = self.connect().await?;
        let result = handle.source.list_columns(table).await;
        self.track(result).await
    }

    async fn fetch_rows(
        &self,
        table: &str,
        column: &str,
        after_id: i64,
        limit: u32,
    ) -> StoreResult<Vec<SourceRow>> {
        let handle = self.connect().await?;
        let result = handle.source.fetch_rows(table, column, after_id, limit).await;
        self.track(result).await
    }
}

#[async_trait]
impl SinkStore for LazyStore {
    async fn ensure_table(&self, name: &str) -> StoreResult<()> {
        let handle = self.connect().await?;
        let result = handle.sink.ensure_table(name).await;
        self.track(result).await
    }

    async fn insert_result(
        &self,
        name: &str,
        job_id: u64,
        url: &str,
        document: &PageDocument,
        status: JobStatus,
    ) -> StoreResult<()> {
        let handle = self.connect().await?;
        let result = handle
            .sink
            .insert_result(name, job_id, url, document, status)
            .await;
        self.track(result).await
    }
}

#[async_trait]
impl CursorStore for LazyStore {
    async fn load_cursor(&self, key: &CursorKey) -> StoreResult<Option<i64>> {
        let handle = self.connect().await?;
        let result = handle.cursors.load_cursor(key).await;
        self.track(result).await
    }

    async fn save_cursor(&self, key: &CursorKey, last_seen_id: i64) -> StoreResult<()> {
        let handle = self.connect().await?;
        let result = handle.cursors.save_cursor(key, last_seen_id).await;
        self.track(result).await
    }
}
