//! Cursor and poll loop tests against file-backed SQLite sources

use crate::common::{refused_url, seed_urls, start_dispatcher};
use scrapeline::config::{parse_config, SourceConfig};
use scrapeline::ingest::{PollLoop, SourceCursor};
use scrapeline::storage::{open_store, CursorKey, LazyStore, SqliteStore, StoreHandle};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn source_config(db_path: &Path, persist: bool) -> SourceConfig {
    source_config_at(&db_path.display().to_string(), persist)
}

fn source_config_at(location: &str, persist: bool) -> SourceConfig {
    let content = format!(
        r#"
[[source]]
name = "catalog"
kind = "sqlite"
location = "{}"
table = "urls"
column = "url"
batch-size = 2
poll-interval-secs = 1
persist-cursor = {}
"#,
        location, persist
    );
    let mut config = parse_config(&content).expect("Failed to parse source config");
    config.sources.remove(0)
}

fn numbered_urls(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| format!("https://site.test/{}", n)).collect()
}

#[tokio::test]
async fn test_file_source_batches_in_order() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::open(&dir.path().join("catalog.db")).unwrap());
    seed_urls(&store, &numbered_urls(1..=5));

    let mut cursor = SourceCursor::new(
        CursorKey::new("catalog", "urls", "url"),
        store,
        2,
        Duration::from_secs(1),
    );

    let mut batches = Vec::new();
    for _ in 0..4 {
        let ids: Vec<i64> = cursor
            .next_batch()
            .await
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();
        batches.push(ids);
    }

    assert_eq!(batches, vec![vec![1, 2], vec![3, 4], vec![5], vec![]]);
    assert_eq!(cursor.last_seen_id(), 5);
}

#[tokio::test]
async fn test_persisted_cursor_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let config = source_config(&db_path, true);

    {
        let seed = SqliteStore::open(&db_path).unwrap();
        seed_urls(&seed, &numbered_urls(1..=5));
        let handle = open_store(&config).await.unwrap();

        let mut cursor = SourceCursor::from_config(&config, &handle).await;
        assert_eq!(cursor.last_seen_id(), 0);
        cursor.next_batch().await.unwrap();
        cursor.next_batch().await.unwrap();
        assert_eq!(cursor.last_seen_id(), 4);
    }

    let handle = open_store(&config).await.unwrap();
    let mut cursor = SourceCursor::from_config(&config, &handle).await;
    assert_eq!(cursor.last_seen_id(), 4);

    let rows = cursor.next_batch().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 5);
    assert_eq!(rows[0].value.as_deref(), Some("https://site.test/5"));
}

#[tokio::test]
async fn test_unpersisted_cursor_restarts_from_zero() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    let config = source_config(&db_path, false);

    {
        let seed = SqliteStore::open(&db_path).unwrap();
        seed_urls(&seed, &numbered_urls(1..=3));
        let handle = open_store(&config).await.unwrap();

        let mut cursor = SourceCursor::from_config(&config, &handle).await;
        cursor.next_batch().await.unwrap();
        assert_eq!(cursor.last_seen_id(), 2);
    }

    let handle = open_store(&config).await.unwrap();
    let mut cursor = SourceCursor::from_config(&config, &handle).await;
    assert_eq!(cursor.last_seen_id(), 0);

    let ids: Vec<i64> = cursor
        .next_batch()
        .await
        .unwrap()
        .iter()
        .map(|row| row.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_rows_dispatched_once_across_ticks() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let first: Vec<String> = (1..=3).map(|n| refused_url(&format!("/{}", n))).collect();
    seed_urls(&store, &first);

    let dispatcher = start_dispatcher(2, HashMap::new());
    let cursor = SourceCursor::new(
        CursorKey::new("catalog", "urls", "url"),
        store.clone(),
        2,
        Duration::from_secs(1),
    );
    let mut poll = PollLoop::new(cursor, dispatcher.clone(), None);

    assert_eq!(poll.tick().await, 2);
    assert_eq!(poll.tick().await, 1);
    assert_eq!(poll.tick().await, 0);

    let second: Vec<String> = (4..=5).map(|n| refused_url(&format!("/{}", n))).collect();
    seed_urls(&store, &second);

    assert_eq!(poll.tick().await, 2);
    assert_eq!(poll.tick().await, 0);
    assert_eq!(poll.cursor().last_seen_id(), 5);

    dispatcher.wait_idle().await;

    let dispatched: Vec<String> = dispatcher
        .jobs()
        .snapshot()
        .into_iter()
        .map(|job| job.url)
        .collect();
    let expected: Vec<String> = first.into_iter().chain(second).collect();
    assert_eq!(dispatched, expected);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_source_created_after_startup_is_polled() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("later").join("catalog.db");
    let config = source_config(&db_path, true);
    let handle = StoreHandle::from_store(Arc::new(LazyStore::new(config.clone())));

    let dispatcher = start_dispatcher(1, HashMap::new());
    let cursor = SourceCursor::from_config(&config, &handle).await;
    let mut poll = PollLoop::new(cursor, dispatcher.clone(), None);

    assert_eq!(poll.tick().await, 0);
    assert_eq!(poll.cursor().last_seen_id(), 0);

    std::fs::create_dir_all(db_path.parent().unwrap()).unwrap();
    let urls: Vec<String> = (1..=3).map(|n| refused_url(&format!("/{}", n))).collect();
    seed_urls(&SqliteStore::open(&db_path).unwrap(), &urls);

    assert_eq!(poll.tick().await, 2);
    assert_eq!(poll.tick().await, 1);
    assert_eq!(poll.cursor().last_seen_id(), 3);

    dispatcher.wait_idle().await;
    let dispatched: Vec<String> = dispatcher
        .jobs()
        .snapshot()
        .into_iter()
        .map(|job| job.url)
        .collect();
    assert_eq!(dispatched, urls);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_read_only_source_is_polled() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("catalog.db");
    seed_urls(&SqliteStore::open(&db_path).unwrap(), &numbered_urls(1..=3));

    for persist in [false, true] {
        let config = source_config_at(&format!("file:{}?mode=ro", db_path.display()), persist);
        let handle = open_store(&config).await.unwrap();

        let mut cursor = SourceCursor::from_config(&config, &handle).await;
        let ids: Vec<i64> = cursor
            .next_batch()
            .await
            .unwrap()
            .iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(cursor.last_seen_id(), 2);
    }

    let tables = SqliteStore::open(&db_path)
        .unwrap()
        .with_connection(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'source_cursors'",
                [],
                |row| row.get::<_, i64>(0),
            )
        })
        .unwrap();
    assert_eq!(tables, 0);
}
