//! Scrapeline: a URL ingestion and scrape pipeline
//!
//! This crate discovers URLs from manual entry, bulk import files, or rows of a
//! relational table, fetches each page, converts it to a normalized document,
//! and records the outcome against a unique job. Results of polled sources are
//! written back to an output table of the same store.

pub mod config;
pub mod dispatch;
pub mod fetcher;
pub mod ingest;
pub mod jobs;
pub mod output;
pub mod rewrite;
pub mod storage;

use thiserror::Error;

/// Main error type for Scrapeline operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StoreError),

    #[error("Job error: {0}")]
    Job(#[from] jobs::JobError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] dispatch::DispatchError),

    #[error("Import error: {0}")]
    Import(#[from] ingest::ImportError),

    #[error("Rewrite error: {0}")]
    Rewrite(#[from] rewrite::RewriteError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type alias for Scrapeline operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{Dispatcher, ResultSink};
pub use fetcher::{PageFetcher, ScrapeResult};
pub use ingest::{import_urls, PollLoop, SourceCursor};
pub use jobs::{Job, JobStatus, JobStore, SinkTarget};
