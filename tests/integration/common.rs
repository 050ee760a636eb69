//! Shared fixtures for the integration tests

use scrapeline::config::{DispatcherConfig, FetcherConfig};
use scrapeline::dispatch::{Dispatcher, ResultSink};
use scrapeline::fetcher::PageFetcher;
use scrapeline::jobs::JobStore;
use scrapeline::storage::SqliteStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Starts a dispatcher with short timeouts and the given sinks
pub fn start_dispatcher(workers: u32, sinks: HashMap<String, ResultSink>) -> Arc<Dispatcher> {
    let fetcher = PageFetcher::new(&FetcherConfig {
        timeout_secs: 5,
        user_agent: Some("ScrapelineTest/1.0".to_string()),
    })
    .expect("Failed to build fetcher");

    Arc::new(Dispatcher::start(
        &DispatcherConfig {
            workers,
            request_delay_ms: 0,
        },
        fetcher,
        Arc::new(JobStore::new()),
        sinks,
    ))
}

/// Creates a `urls` table holding the given values with ids 1..=n
pub fn seed_urls(store: &SqliteStore, urls: &[String]) {
    store
        .with_connection(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS urls (id INTEGER PRIMARY KEY AUTOINCREMENT, url TEXT)",
            )?;
            for url in urls {
                conn.execute("INSERT INTO urls (url) VALUES (?1)", rusqlite::params![url])?;
            }
            Ok(())
        })
        .expect("Failed to seed urls table");
}

/// Returns a localhost URL on a port nothing listens on
pub fn refused_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("No local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}{}", port, path)
}
