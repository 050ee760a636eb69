//! Rewrite pass tests against a mocked Ollama server

use scrapeline::config::RewriterConfig;
use scrapeline::fetcher::{PageDocument, ScrapeResult};
use scrapeline::rewrite::{rewrite_pending, OllamaRewriter};
use scrapeline::storage::ScrapeArchive;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn archived(archive: &ScrapeArchive, markdown: &str) -> ScrapeResult {
    let result = ScrapeResult::success(
        "https://a.test",
        "https://a.test/",
        200,
        PageDocument {
            markdown: markdown.to_string(),
            ..PageDocument::default()
        },
    );
    archive.store_result(&result).unwrap();
    result
}

fn rewriter_for(server: &MockServer) -> OllamaRewriter {
    OllamaRewriter::new(RewriterConfig {
        endpoint: server.uri(),
        model: "llama3.2".to_string(),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_rewrite_stores_trimmed_answer() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "llama3.2", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "  Better text  "},
            "done": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let archive = ScrapeArchive::open_in_memory().unwrap();
    let result = archived(&archive, "# Original text");

    let summary = rewrite_pending(&archive, &rewriter_for(&mock_server))
        .await
        .unwrap();
    assert_eq!(summary.rewritten, 1);
    assert_eq!(summary.failed, 0);

    let record = archive.find(&result.scrape_id).unwrap().unwrap();
    assert_eq!(record.rewrite.as_deref(), Some("Better text"));
    assert_eq!(record.markdown, "# Original text");
    assert!(archive.pending_rewrites().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_error_counts_as_failed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let archive = ScrapeArchive::open_in_memory().unwrap();
    let result = archived(&archive, "# Original text");

    let summary = rewrite_pending(&archive, &rewriter_for(&mock_server))
        .await
        .unwrap();
    assert_eq!(summary.rewritten, 0);
    assert_eq!(summary.failed, 1);

    let record = archive.find(&result.scrape_id).unwrap().unwrap();
    assert!(record.rewrite.is_none());
    assert_eq!(archive.pending_rewrites().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_markdown_skipped_without_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let archive = ScrapeArchive::open_in_memory().unwrap();
    archived(&archive, "   ");

    let summary = rewrite_pending(&archive, &rewriter_for(&mock_server))
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rewritten, 0);
}
