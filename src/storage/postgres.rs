//! PostgreSQL store implementation
//!
//! Available with the `postgres` feature. One client connection is shared by
//! every caller; `tokio-postgres` pipelines concurrent queries over it. Once
//! the connection drops every call fails with [`StoreError::Unavailable`], so a
//! [`LazyStore`](crate::storage::LazyStore) can reconnect.

use crate::fetcher::PageDocument;
use crate::jobs::JobStatus;
use crate::storage::schema::postgres_output_table_sql;
use crate::storage::traits::{CursorStore, SinkStore, SourceStore};
use crate::storage::{quote_identifier, CursorKey, SourceRow, StoreError, StoreResult};
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

const CURSOR_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS source_cursors (
    source TEXT NOT NULL,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    last_seen_id BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (source, table_name, column_name)
)
"#;

const CURSOR_EXISTS_SQL: &str = "SELECT to_regclass('source_cursors') IS NOT NULL";

/// Builds the batch query for a source table
///
/// Ids may be `integer` or `bigint`; both sides of the comparison are cast so
/// the parameters always bind as `int8`.
fn fetch_rows_sql(table: &str, column: &str) -> StoreResult<String> {
    Ok(format!(
        "SELECT id::bigint, {}::text FROM {} WHERE id::bigint > $1::bigint ORDER BY id ASC LIMIT $2::bigint",
        quote_identifier(column)?,
        quote_identifier(table)?
    ))
}

/// Builds the insert for an output table whose `job_id` may be `integer`
fn insert_result_sql(table: &str) -> StoreResult<String> {
    Ok(format!(
        "INSERT INTO {} (job_id, url, response, status) VALUES ($1::bigint, $2::text, $3::text, $4::text)",
        quote_identifier(table)?
    ))
}

/// PostgreSQL store backend
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connects using a libpq-style connection string
    ///
    /// The connection task is spawned onto the current runtime. Nothing is
    /// written on connect.
    pub async fn connect(connection_string: &str) -> StoreResult<Self> {
        let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection closed: {}", e);
            }
        });

        Ok(Self { client })
    }

    fn client(&self) -> StoreResult<&Client> {
        if self.client.is_closed() {
            return Err(StoreError::Unavailable(
                "PostgreSQL connection closed".to_string(),
            ));
        }
        Ok(&self.client)
    }
}

#[async_trait]
impl SourceStore for PostgresStore {
    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let rows = self
            .client()?
            .query(
                "SELECT table_name::text FROM information_schema.tables
                 WHERE table_schema = 'public' ORDER BY table_name",
                &[],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn list_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        let rows = self
            .client()?
            .query(
                "SELECT column_name::text FROM information_schema.columns
                 WHERE table_name = $1::text ORDER BY ordinal_position",
                &[&table],
            )
            .await?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn fetch_rows(
        &self,
        table: &str,
        column: &str,
        after_id: i64,
        limit: u32,
    ) -> StoreResult<Vec<SourceRow>> {
        let sql = fetch_rows_sql(table, column)?;
        let rows = self
            .client()?
            .query(&sql, &[&after_id, &i64::from(limit)])
            .await?;

        Ok(rows
            .iter()
            .map(|row| SourceRow {
                id: row.get(0),
                value: row.get(1),
            })
            .collect())
    }
}

#[async_trait]
impl SinkStore for PostgresStore {
    async fn ensure_table(&self, name: &str) -> StoreResult<()> {
        let sql = postgres_output_table_sql(&quote_identifier(name)?);
        self.client()?.batch_execute(&sql).await?;
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
        let sql = insert_result_sql(name)?;
        let job_id = job_id as i64;
        self.client()?
            .execute(
                &sql,
                &[&job_id, &url, &document.markdown, &status.to_db_string()],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CursorStore for PostgresStore {
    async fn load_cursor(&self, key: &CursorKey) -> StoreResult<Option<i64>> {
        let client = self.client()?;
        let exists: bool = client.query_one(CURSOR_EXISTS_SQL, &[]).await?.get(0);
        if !exists {
            return Ok(None);
        }

        let row = client
            .query_opt(
                "SELECT last_seen_id FROM source_cursors
                 WHERE source = $1::text AND table_name = $2::text AND column_name = $3::text",
                &[&key.source, &key.table, &key.column],
            )
            .await?;
        Ok(row.map(|row| row.get(0)))
    }

    async fn save_cursor(&self, key: &CursorKey, last_seen_id: i64) -> StoreResult<()> {
        let client = self.client()?;
        client.batch_execute(CURSOR_SCHEMA_SQL).await?;
        client
            .execute(
                "INSERT INTO source_cursors (source, table_name, column_name, last_seen_id)
                 VALUES ($1::text, $2::text, $3::text, $4::bigint)
                 ON CONFLICT (source, table_name, column_name) DO UPDATE SET
                    last_seen_id = GREATEST(source_cursors.last_seen_id, EXCLUDED.last_seen_id),
                    updated_at = now()",
                &[&key.source, &key.table, &key.column, &last_seen_id],
            )
            .await?;
        Ok(())
    }
}
