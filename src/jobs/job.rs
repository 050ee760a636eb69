use crate::fetcher::ScrapeResult;
use crate::jobs::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Names the configured source whose store receives a job's result
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkTarget {
    /// Source name from the configuration
    pub source: String,
    /// Output table inside that source's store
    pub output_table: String,
}

impl SinkTarget {
    pub fn new(source: impl Into<String>, output_table: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output_table: output_table.into(),
        }
    }
}

/// Outcome of persisting a job's result to its sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkOutcome {
    Written,
    Failed(String),
}

/// One requested URL tracked through its status lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub url: String,
    pub status: JobStatus,
    /// Set exactly once, on the terminal transition
    pub result: Option<ScrapeResult>,
    pub created_at: DateTime<Utc>,
    pub sink: Option<SinkTarget>,
    /// Set after the terminal transition for jobs with a sink
    pub sink_outcome: Option<SinkOutcome>,
}

impl Job {
    pub(crate) fn new(id: u64, url: String, sink: Option<SinkTarget>) -> Self {
        Self {
            id,
            url,
            status: JobStatus::Queued,
            result: None,
            created_at: Utc::now(),
            sink,
            sink_outcome: None,
        }
    }

    /// Title of the fetched document, if the job completed with one
    pub fn title(&self) -> Option<&str> {
        self.result
            .as_ref()
            .map(|r| r.document.metadata.title.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Error message of the fetch attempt, if any
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().and_then(|r| r.error.as_deref())
    }
}
