//! End-to-end tests for submit → fetch → job store → result sink

use crate::common::{refused_url, seed_urls, start_dispatcher};
use async_trait::async_trait;
use scrapeline::dispatch::ResultSink;
use scrapeline::fetcher::{PageDocument, PageMetadata};
use scrapeline::ingest::{PollLoop, SourceCursor};
use scrapeline::jobs::{JobStatus, SinkOutcome, SinkTarget};
use scrapeline::storage::{CursorKey, SinkStore, SqliteStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>{}</title></head><body><p>Body of {}</p></body></html>"#,
                    title, title
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submit_ok_page_completes() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/ok", "Hi").await;

    let dispatcher = start_dispatcher(2, HashMap::new());
    let job = dispatcher
        .submit(&format!("{}/ok", mock_server.uri()), None)
        .expect("submit failed");
    assert_eq!(job.status, JobStatus::Queued);

    dispatcher.wait_idle().await;

    let job = dispatcher.jobs().get(job.id).expect("job missing");
    assert_eq!(job.status, JobStatus::Completed);

    let result = job.result.expect("result missing");
    assert_eq!(result.document.metadata.title, "Hi");
    assert_eq!(result.status_code, Some(200));
    assert!(result.error.is_none());
    assert!(result.document.markdown.contains("Body of Hi"));
    assert!(job.sink_outcome.is_none());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_submit_refused_host_errors() {
    let dispatcher = start_dispatcher(1, HashMap::new());
    let job = dispatcher
        .submit(&refused_url("/down"), None)
        .expect("submit failed");

    dispatcher.wait_idle().await;

    let job = dispatcher.jobs().get(job.id).expect("job missing");
    assert_eq!(job.status, JobStatus::Error);

    let result = job.result.expect("result missing");
    assert!(!result.error.as_deref().unwrap_or_default().is_empty());
    assert_eq!(result.status_code, None);
    assert_eq!(result.document, PageDocument::default());
    assert_eq!(result.document.metadata, PageMetadata::default());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_non_success_status_errors_with_code() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<title>Not here</title>"))
        .mount(&mock_server)
        .await;

    let dispatcher = start_dispatcher(1, HashMap::new());
    let job = dispatcher
        .submit(&format!("{}/missing", mock_server.uri()), None)
        .unwrap();
    dispatcher.wait_idle().await;

    let job = dispatcher.jobs().get(job.id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    let result = job.result.unwrap();
    assert_eq!(result.status_code, Some(404));
    assert_eq!(result.error.as_deref(), Some("HTTP 404"));
    assert!(result.document.metadata.title.is_empty());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_success_other_than_200_is_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accepted"))
        .respond_with(ResponseTemplate::new(202).set_body_string("<title>Later</title>"))
        .mount(&mock_server)
        .await;

    let dispatcher = start_dispatcher(1, HashMap::new());
    let job = dispatcher
        .submit(&format!("{}/accepted", mock_server.uri()), None)
        .unwrap();
    dispatcher.wait_idle().await;

    let job = dispatcher.jobs().get(job.id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    let result = job.result.unwrap();
    assert_eq!(result.status_code, Some(202));
    assert!(result.error.is_none());

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_headers_and_cookies_captured() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cookies"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>C</title></head></html>")
                .insert_header("x-served-by", "mock")
                .insert_header("set-cookie", "session=abc123; Path=/"),
        )
        .mount(&mock_server)
        .await;

    let dispatcher = start_dispatcher(1, HashMap::new());
    let job = dispatcher
        .submit(&format!("{}/cookies", mock_server.uri()), None)
        .unwrap();
    dispatcher.wait_idle().await;

    let metadata = dispatcher
        .jobs()
        .get(job.id)
        .unwrap()
        .result
        .unwrap()
        .document
        .metadata;
    assert_eq!(metadata.headers.get("x-served-by").map(String::as_str), Some("mock"));
    assert_eq!(metadata.cookies.get("session").map(String::as_str), Some("abc123"));

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_many_jobs_all_terminal_with_unique_ids() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/ok", "Hi").await;

    let dispatcher = start_dispatcher(3, HashMap::new());
    let mut urls: Vec<String> = (0..10).map(|_| format!("{}/ok", mock_server.uri())).collect();
    urls.push(refused_url("/down"));

    let jobs = dispatcher.submit_many(&urls, None).unwrap();
    assert_eq!(jobs.len(), 11);
    dispatcher.wait_idle().await;

    let snapshot = dispatcher.jobs().snapshot();
    let ids: Vec<u64> = snapshot.iter().map(|j| j.id).collect();
    assert_eq!(ids, (1..=11).collect::<Vec<u64>>());
    assert_eq!(
        snapshot
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count(),
        10
    );
    assert_eq!(snapshot[10].status, JobStatus::Error);
    assert!(snapshot.iter().all(|j| j.result.is_some()));

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_polled_rows_written_to_sink() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/a", "A").await;
    mount_page(&mock_server, "/b", "B").await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    seed_urls(
        &store,
        &[
            format!("{}/a", mock_server.uri()),
            format!("{}/b", mock_server.uri()),
            refused_url("/c"),
        ],
    );

    let mut sinks = HashMap::new();
    sinks.insert("catalog".to_string(), ResultSink::new(store.clone()));
    let dispatcher = start_dispatcher(2, sinks);

    let cursor = SourceCursor::new(
        CursorKey::new("catalog", "urls", "url"),
        store.clone(),
        10,
        Duration::from_secs(1),
    );
    let mut poll = PollLoop::new(
        cursor,
        dispatcher.clone(),
        Some(SinkTarget::new("catalog", "scrape_output")),
    );

    assert_eq!(poll.tick().await, 3);
    dispatcher.wait_idle().await;

    let rows: Vec<(i64, String, String)> = store
        .with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT job_id, response, status FROM scrape_output ORDER BY job_id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<_>, _>>();
            rows
        })
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].0, 1);
    assert!(rows[0].1.contains("Body of A"));
    assert_eq!(rows[0].2, "completed");
    assert_eq!(rows[1].2, "completed");
    assert_eq!(rows[2].1, "");
    assert_eq!(rows[2].2, "error");

    for job in dispatcher.jobs().snapshot() {
        assert_eq!(job.sink_outcome, Some(SinkOutcome::Written));
    }

    dispatcher.shutdown().await;
}

struct RejectingSink;

#[async_trait]
impl SinkStore for RejectingSink {
    async fn ensure_table(&self, _name: &str) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_result(
        &self,
        _name: &str,
        _job_id: u64,
        _url: &str,
        _document: &PageDocument,
        _status: JobStatus,
    ) -> StoreResult<()> {
        Err(StoreError::Unavailable("sink offline".to_string()))
    }
}

#[tokio::test]
async fn test_sink_failure_keeps_job_status() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/ok", "Hi").await;

    let mut sinks = HashMap::new();
    sinks.insert("catalog".to_string(), ResultSink::new(Arc::new(RejectingSink)));
    let dispatcher = start_dispatcher(1, sinks);

    let job = dispatcher
        .submit(
            &format!("{}/ok", mock_server.uri()),
            Some(SinkTarget::new("catalog", "scrape_output")),
        )
        .unwrap();
    dispatcher.wait_idle().await;

    let job = dispatcher.jobs().get(job.id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    match job.sink_outcome {
        Some(SinkOutcome::Failed(reason)) => assert!(reason.contains("sink offline")),
        other => panic!("unexpected sink outcome: {:?}", other),
    }

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_cleared_job_still_written_to_sink() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<title>Slow</title>")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mut sinks = HashMap::new();
    sinks.insert("catalog".to_string(), ResultSink::new(store.clone()));
    let dispatcher = start_dispatcher(1, sinks);

    dispatcher
        .submit(
            &format!("{}/slow", mock_server.uri()),
            Some(SinkTarget::new("catalog", "scrape_output")),
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    dispatcher.jobs().clear();

    dispatcher.wait_idle().await;
    assert!(dispatcher.jobs().is_empty());

    let count: i64 = store
        .with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM scrape_output", [], |row| row.get(0))
        })
        .unwrap();
    assert_eq!(count, 1);

    dispatcher.shutdown().await;
}
