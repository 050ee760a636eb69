//! Storage module for relational sources and sinks
//!
//! This module handles all database operations for the pipeline, including:
//! - Reading URL rows from a source table in id order
//! - Creating output tables and inserting job results
//! - Persisting source cursors across restarts
//! - The single-shot scrape archive
//!
//! Engines implement the narrow [`SourceStore`], [`SinkStore`] and
//! [`CursorStore`] traits. SQLite is always available; PostgreSQL is behind the
//! `postgres` feature. Configured sources are reached through a [`LazyStore`],
//! which connects on demand and reconnects after a lost connection.

mod archive;
mod lazy;
#[cfg(feature = "postgres")]
mod postgres;
mod schema;
mod sqlite;
mod traits;

pub use archive::{ArchiveRecord, PendingRewrite, ScrapeArchive};
pub use lazy::LazyStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use traits::{CursorStore, SinkStore, SourceStore};

use crate::config::{SourceConfig, SourceKind};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        StoreError::Postgres(e.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One row read from a source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub id: i64,
    /// Column value as text; None for NULL
    pub value: Option<String>,
}

/// Identity of a persisted cursor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorKey {
    pub source: String,
    pub table: String,
    pub column: String,
}

impl CursorKey {
    pub fn new(
        source: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Returns true for plain SQL identifiers: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates an identifier and wraps it in double quotes for interpolation
pub fn quote_identifier(name: &str) -> StoreResult<String> {
    if !is_valid_identifier(name) {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name))
}

/// One connection to a configured source, viewed through each trait
#[derive(Clone)]
pub struct StoreHandle {
    pub source: Arc<dyn SourceStore>,
    pub sink: Arc<dyn SinkStore>,
    pub cursors: Arc<dyn CursorStore>,
}

impl StoreHandle {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SourceStore + SinkStore + CursorStore + 'static,
    {
        Self {
            source: store.clone(),
            sink: store.clone(),
            cursors: store,
        }
    }
}

/// Opens the store backing a configured source
///
/// # Arguments
///
/// * `config` - The source configuration
///
/// # Returns
///
/// * `Ok(StoreHandle)` - Connected store
/// * `Err(StoreError)` - Connection failed, or the engine is not compiled in
pub async fn open_store(config: &SourceConfig) -> StoreResult<StoreHandle> {
    match config.kind {
        SourceKind::Sqlite => {
            let store = SqliteStore::connect(&config.location)?;
            Ok(StoreHandle::from_store(Arc::new(store)))
        }
        #[cfg(feature = "postgres")]
        SourceKind::Postgres => {
            let store = PostgresStore::connect(&config.location).await?;
            Ok(StoreHandle::from_store(Arc::new(store)))
        }
        #[cfg(not(feature = "postgres"))]
        SourceKind::Postgres => Err(StoreError::Unavailable(format!(
            "source '{}' needs the postgres feature",
            config.name
        ))),
    }
}
