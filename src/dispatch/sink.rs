use crate::fetcher::PageDocument;
use crate::jobs::Job;
use crate::storage::{SinkStore, StoreResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Persists finished jobs into output tables of one store
pub struct ResultSink {
    store: Arc<dyn SinkStore>,
    ensured: Mutex<HashSet<String>>,
}

impl ResultSink {
    pub fn new(store: Arc<dyn SinkStore>) -> Self {
        Self {
            store,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// Creates the output table if absent
    ///
    /// Idempotent. After the first success for a table the store is not asked
    /// again.
    pub async fn ensure_schema(&self, output_table: &str) -> StoreResult<()> {
        if self.is_ensured(output_table) {
            return Ok(());
        }

        self.store.ensure_table(output_table).await?;
        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(output_table.to_string());
        debug!("Output table '{}' ready", output_table);
        Ok(())
    }

    fn is_ensured(&self, output_table: &str) -> bool {
        self.ensured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(output_table)
    }

    /// Inserts one row for a finished job
    ///
    /// The row carries the job id, URL, Markdown text and status. A job with
    /// no result writes an empty response.
    pub async fn write(&self, output_table: &str, job: &Job) -> StoreResult<()> {
        self.ensure_schema(output_table).await?;

        let empty = PageDocument::default();
        let document = job.result.as_ref().map(|r| &r.document).unwrap_or(&empty);

        self.store
            .insert_result(output_table, job.id, &job.url, document, job.status)
            .await
    }
}
