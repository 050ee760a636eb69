//! Content rewriting
//!
//! An optional post-processing pass: archived scrapes without a rewrite are
//! sent to a language model and the answer is stored next to the original.

mod ollama;

pub use ollama::{OllamaRewriter, REWRITE_PROMPT};

use crate::storage::{ScrapeArchive, StoreError};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur while rewriting content
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Produces a revised version of a document's text
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(&self, content: &str) -> Result<String, RewriteError>;
}

/// Counts from one rewrite pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub rewritten: usize,
    /// Rows with no Markdown to rewrite
    pub skipped: usize,
    pub failed: usize,
}

/// Rewrites every archived row that has no rewrite yet
///
/// Failures are logged per row and do not stop the pass.
///
/// # Returns
///
/// * `Ok(RewriteSummary)` - Per-outcome counts
/// * `Err(RewriteError::Store)` - The pending rows could not be listed
pub async fn rewrite_pending(
    archive: &ScrapeArchive,
    rewriter: &dyn Rewriter,
) -> Result<RewriteSummary, RewriteError> {
    let pending = archive.pending_rewrites()?;
    let mut summary = RewriteSummary::default();

    if pending.is_empty() {
        info!("No records to rewrite");
        return Ok(summary);
    }
    info!("Found {} record(s) to rewrite", pending.len());

    for row in pending {
        let Some(markdown) = row.markdown.filter(|m| !m.trim().is_empty()) else {
            warn!("Record {} has empty markdown content, skipping", row.id);
            summary.skipped += 1;
            continue;
        };

        let rewritten = match rewriter.rewrite(&markdown).await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to rewrite record {}: {}", row.id, e);
                summary.failed += 1;
                continue;
            }
        };

        match archive.set_rewrite(row.id, &rewritten) {
            Ok(()) => {
                info!("Updated record {} with rewritten content", row.id);
                summary.rewritten += 1;
            }
            Err(e) => {
                error!("Failed to store rewrite for record {}: {}", row.id, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
