//! Job tracking for the scrape pipeline
//!
//! This module provides the job data model and the registry that owns every
//! job for the lifetime of the process.
//!
//! # Components
//!
//! - `JobStatus`: Lifecycle of a job (queued, in progress, completed, error)
//! - `Job`: One URL and the outcome of fetching it
//! - `JobStore`: Concurrency-safe registry with a snapshot view for display

mod job;
mod status;
mod store;

pub use job::{Job, SinkOutcome, SinkTarget};
pub use status::JobStatus;
pub use store::JobStore;

use thiserror::Error;

/// Errors raised by the job registry
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job {0} not found")]
    NotFound(u64),

    #[error("Job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: u64,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {id} cannot move to {to} without a result")]
    MissingResult { id: u64, to: JobStatus },

    #[error("Job URL cannot be empty")]
    EmptyUrl,
}
