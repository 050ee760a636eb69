//! Single-shot scrape archive
//!
//! One row per scrape attempt in the `scraped_data` table, keyed by scrape id.
//! Structured metadata fields are JSON-encoded one column each. The `rewrite`
//! column is filled later by the rewriting pass.

use crate::fetcher::ScrapeResult;
use crate::storage::schema::initialize_archive_schema;
use crate::storage::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A stored row awaiting a rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRewrite {
    pub id: i64,
    pub markdown: Option<String>,
}

/// Summary of one archived scrape
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub id: i64,
    pub scrape_id: String,
    pub title: String,
    pub source_url: String,
    pub final_url: String,
    pub status_code: Option<u16>,
    pub markdown: String,
    pub error: Option<String>,
    pub rewrite: Option<String>,
}

/// SQLite-backed archive of single-shot scrapes
pub struct ScrapeArchive {
    conn: Mutex<Connection>,
}

impl ScrapeArchive {
    /// Opens or creates the archive database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        initialize_archive_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory archive
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_archive_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("archive connection lock poisoned".to_string()))
    }

    /// Stores a scrape result, replacing any row with the same scrape id
    ///
    /// # Returns
    ///
    /// The row id of the stored record
    pub fn store_result(&self, result: &ScrapeResult) -> StoreResult<i64> {
        let metadata = &result.document.metadata;

        let open_graph = serde_json::to_string(&metadata.open_graph)?;
        let links = serde_json::to_string(&metadata.links)?;
        let images = serde_json::to_string(&metadata.images)?;
        let structured_data = serde_json::to_string(&metadata.structured_data)?;
        let headers = serde_json::to_string(&metadata.headers)?;
        let cookies = serde_json::to_string(&metadata.cookies)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO scraped_data (
                scrape_id, title, viewport, source_url, final_url, status_code,
                markdown, html, meta_description, meta_keywords, open_graph,
                links, images, structured_data, headers, cookies, error
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                result.scrape_id,
                metadata.title,
                metadata.viewport,
                result.requested_url,
                result.final_url,
                result.status_code,
                result.document.markdown,
                result.document.html,
                metadata.description,
                metadata.keywords,
                open_graph,
                links,
                images,
                structured_data,
                headers,
                cookies,
                result.error,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Lists rows whose rewrite column is NULL or empty, in id order
    pub fn pending_rewrites(&self) -> StoreResult<Vec<PendingRewrite>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, markdown FROM scraped_data WHERE rewrite IS NULL OR rewrite = '' ORDER BY id",
        )?;
        let pending = stmt
            .query_map([], |row| {
                Ok(PendingRewrite {
                    id: row.get(0)?,
                    markdown: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pending)
    }

    /// Stores rewritten content for a row
    pub fn set_rewrite(&self, id: i64, content: &str) -> StoreResult<()> {
        self.lock()?.execute(
            "UPDATE scraped_data SET rewrite = ?1 WHERE id = ?2",
            params![content, id],
        )?;
        Ok(())
    }

    /// Looks up a row by scrape id
    pub fn find(&self, scrape_id: &str) -> StoreResult<Option<ArchiveRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, scrape_id, title, source_url, final_url, status_code, markdown, error, rewrite
                 FROM scraped_data WHERE scrape_id = ?1",
                params![scrape_id],
                |row| {
                    Ok(ArchiveRecord {
                        id: row.get(0)?,
                        scrape_id: row.get(1)?,
                        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        source_url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        final_url: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        status_code: row.get(5)?,
                        markdown: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                        error: row.get(7)?,
                        rewrite: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}
