//! Database schema definitions
//!
//! This module contains the SQL for the tables Scrapeline owns. Output tables
//! are named by configuration, so their DDL is built per name.

/// Cursor table, created in every SQLite source store
pub const CURSOR_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS source_cursors (
    source TEXT NOT NULL,
    table_name TEXT NOT NULL,
    column_name TEXT NOT NULL,
    last_seen_id INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (source, table_name, column_name)
);
"#;

/// Single-shot scrape archive
pub const ARCHIVE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scraped_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scrape_id TEXT UNIQUE,
    title TEXT,
    viewport TEXT,
    source_url TEXT,
    final_url TEXT,
    status_code INTEGER,
    markdown TEXT,
    html TEXT,
    meta_description TEXT,
    meta_keywords TEXT,
    open_graph TEXT,
    links TEXT,
    images TEXT,
    structured_data TEXT,
    headers TEXT,
    cookies TEXT,
    error TEXT,
    rewrite TEXT
);
"#;

/// Builds the SQLite DDL for an output table
///
/// `quoted_name` must already be validated and quoted.
pub fn sqlite_output_table_sql(quoted_name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id INTEGER,
            url TEXT,
            response TEXT,
            status TEXT
        )",
        quoted_name
    )
}

/// Builds the PostgreSQL DDL for an output table
#[cfg(feature = "postgres")]
pub fn postgres_output_table_sql(quoted_name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id SERIAL PRIMARY KEY,
            job_id BIGINT,
            url TEXT,
            response TEXT,
            status TEXT
        )",
        quoted_name
    )
}

/// Initializes the cursor table
pub fn initialize_cursor_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CURSOR_SCHEMA_SQL)
}

/// Initializes the archive table
pub fn initialize_archive_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(ARCHIVE_SCHEMA_SQL)
}
