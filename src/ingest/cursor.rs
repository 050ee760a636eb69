use crate::config::SourceConfig;
use crate::storage::{CursorKey, CursorStore, SourceRow, SourceStore, StoreHandle, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Polling state for one (source, table, column)
///
/// `last_seen_id` starts at 0 and only grows: a row with an id at or below it
/// is never fetched again by this cursor.
pub struct SourceCursor {
    key: CursorKey,
    store: Arc<dyn SourceStore>,
    persistence: Option<Arc<dyn CursorStore>>,
    batch_size: u32,
    poll_interval: Duration,
    last_seen_id: i64,
    /// False until the persisted position has been loaded
    restored: bool,
}

impl SourceCursor {
    /// Creates a process-lifetime cursor starting at 0
    pub fn new(
        key: CursorKey,
        store: Arc<dyn SourceStore>,
        batch_size: u32,
        poll_interval: Duration,
    ) -> Self {
        Self {
            key,
            store,
            persistence: None,
            batch_size: batch_size.max(1),
            poll_interval,
            last_seen_id: 0,
            restored: true,
        }
    }

    /// Saves the cursor to `cursors` after every advancing batch
    ///
    /// The stored position is loaded by [`restore`](Self::restore), or before
    /// the first batch if it was never called.
    pub fn with_persistence(mut self, cursors: Arc<dyn CursorStore>) -> Self {
        self.persistence = Some(cursors);
        self.restored = false;
        self
    }

    /// Builds the cursor for a configured source
    ///
    /// With `persist-cursor` enabled the stored position is restored. A
    /// failing restore is logged and tried again before each batch until it
    /// succeeds, so a source that is down at startup keeps its position.
    pub async fn from_config(config: &SourceConfig, handle: &StoreHandle) -> Self {
        let key = CursorKey::new(&config.name, &config.table, &config.column);
        let mut cursor = Self::new(
            key,
            handle.source.clone(),
            config.batch_size,
            config.poll_interval(),
        );

        if config.persist_cursor {
            cursor = cursor.with_persistence(handle.cursors.clone());
            if let Err(e) = cursor.restore().await {
                warn!(
                    "Failed to restore cursor for source '{}', retrying before next batch: {}",
                    config.name, e
                );
            }
        }

        cursor
    }

    /// Loads the persisted position, if any
    ///
    /// # Returns
    ///
    /// The cursor value after restoring
    pub async fn restore(&mut self) -> StoreResult<i64> {
        if let Some(cursors) = &self.persistence {
            if let Some(stored) = cursors.load_cursor(&self.key).await? {
                if stored > self.last_seen_id {
                    info!(
                        "Restored cursor for {}.{}.{} at id {}",
                        self.key.source, self.key.table, self.key.column, stored
                    );
                    self.last_seen_id = stored;
                }
            }
        }
        self.restored = true;
        Ok(self.last_seen_id)
    }

    /// Fetches the next batch of rows after the cursor
    ///
    /// Rows come back ascending by id, at most `batch_size` of them. On a
    /// non-empty batch the cursor moves to the highest id returned before the
    /// caller dispatches anything, so a row is consumed even if its job later
    /// fails. A source error leaves the cursor unchanged.
    ///
    /// A persisted position that could not be loaded yet is loaded first. If
    /// that fails again the batch is still read from the in-memory position.
    pub async fn next_batch(&mut self) -> StoreResult<Vec<SourceRow>> {
        if !self.restored {
            if let Err(e) = self.restore().await {
                warn!(
                    "Cursor for source '{}' not restored, reading from id {}: {}",
                    self.key.source, self.last_seen_id, e
                );
            }
        }

        let rows = self
            .store
            .fetch_rows(
                &self.key.table,
                &self.key.column,
                self.last_seen_id,
                self.batch_size,
            )
            .await?;

        let Some(max_id) = rows.iter().map(|row| row.id).max() else {
            return Ok(rows);
        };

        if max_id > self.last_seen_id {
            debug!(
                "Cursor {}.{} advanced {} -> {}",
                self.key.source, self.key.table, self.last_seen_id, max_id
            );
            self.last_seen_id = max_id;
            self.persist().await;
        }

        Ok(rows)
    }

    async fn persist(&self) {
        if let Some(cursors) = &self.persistence {
            if let Err(e) = cursors.save_cursor(&self.key, self.last_seen_id).await {
                warn!(
                    "Failed to persist cursor for source '{}' at id {}: {}",
                    self.key.source, self.last_seen_id, e
                );
            }
        }
    }

    pub fn last_seen_id(&self) -> i64 {
        self.last_seen_id
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn key(&self) -> &CursorKey {
        &self.key
    }
}
