//! Job dispatch
//!
//! This module turns submitted URLs into finished jobs. A fixed pool of Tokio
//! workers drains one queue, fetches each page, records the outcome in the job
//! store, and hands results of polled sources to their [`ResultSink`].

mod dispatcher;
mod sink;

pub use dispatcher::Dispatcher;
pub use sink::ResultSink;

use crate::jobs::JobError;
use thiserror::Error;

/// Errors raised when submitting work
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatcher is shut down")]
    Closed,

    #[error(transparent)]
    Job(#[from] JobError),
}
