//! SQLite store implementation
//!
//! This module provides a SQLite-backed source, sink and cursor store. One
//! connection is shared by every caller and access is serialized by a mutex.

use crate::fetcher::PageDocument;
use crate::jobs::JobStatus;
use crate::storage::schema::{initialize_cursor_schema, sqlite_output_table_sql};
use crate::storage::traits::{CursorStore, SinkStore, SourceStore};
use crate::storage::{quote_identifier, CursorKey, SourceRow, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite store backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a SQLite database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::configure(Connection::open(path)?)
    }

    /// Opens an existing database for a configured source
    ///
    /// `location` is a file path or a `file:` URI such as
    /// `file:catalog.db?mode=ro`. A missing file is an error rather than a new
    /// empty database. Nothing is written on open.
    pub fn connect(location: &str) -> StoreResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::configure(Connection::open_with_flags(location, flags)?)
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs a closure against the shared connection
    ///
    /// Gives direct access for seeding or inspecting tables outside the store
    /// traits.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> StoreResult<T> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("SQLite connection lock poisoned".to_string()))
    }
}

fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[async_trait]
impl SourceStore for SqliteStore {
    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        let table = quote_identifier(table)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    async fn fetch_rows(
        &self,
        table: &str,
        column: &str,
        after_id: i64,
        limit: u32,
    ) -> StoreResult<Vec<SourceRow>> {
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id > ?1 ORDER BY id ASC LIMIT ?2",
            quote_identifier(column)?,
            quote_identifier(table)?
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![after_id, limit], |row| {
                Ok(SourceRow {
                    id: row.get(0)?,
                    value: value_to_text(row.get_ref(1)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl SinkStore for SqliteStore {
    async fn ensure_table(&self, name: &str) -> StoreResult<()> {
        let sql = sqlite_output_table_sql(&quote_identifier(name)?);
        self.lock()?.execute_batch(&sql)?;
        Ok(())
    }

    async fn insert_result(
        &self,
        name: &str,
        job_id: u64,
        url: &str,
        document: &PageDocument,
        status: JobStatus,
    ) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (job_id, url, response, status) VALUES (?1, ?2, ?3, ?4)",
            quote_identifier(name)?
        );
        self.lock()?.execute(
            &sql,
            params![
                job_id as i64,
                url,
                document.markdown,
                status.to_db_string()
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl CursorStore for SqliteStore {
    async fn load_cursor(&self, key: &CursorKey) -> StoreResult<Option<i64>> {
        let conn = self.lock()?;
        // The cursor table only exists once a cursor was saved
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'source_cursors')",
            [],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(None);
        }

        let value = conn
            .query_row(
                "SELECT last_seen_id FROM source_cursors
                 WHERE source = ?1 AND table_name = ?2 AND column_name = ?3",
                params![key.source, key.table, key.column],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn save_cursor(&self, key: &CursorKey, last_seen_id: i64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.lock()?;
        initialize_cursor_schema(&conn)?;
        conn.execute(
            "INSERT INTO source_cursors (source, table_name, column_name, last_seen_id, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (source, table_name, column_name) DO UPDATE SET
                last_seen_id = MAX(last_seen_id, excluded.last_seen_id),
                updated_at = excluded.updated_at",
            params![key.source, key.table, key.column, last_seen_id, now],
        )?;
        Ok(())
    }
}
