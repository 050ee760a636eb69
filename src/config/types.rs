use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Scrapeline
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub rewriter: Option<RewriterConfig>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Fixed request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent override; `impersonate` (or absent) selects a browser profile
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

/// Job dispatcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Number of workers draining the job queue
    #[serde(default = "default_workers")]
    pub workers: u32,

    /// Fixed pause a worker takes after each fetch (milliseconds)
    #[serde(rename = "request-delay-ms", default)]
    pub request_delay_ms: u64,
}

impl DispatcherConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            request_delay_ms: 0,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite archive used by single-shot scrapes and rewrites
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Content rewriting collaborator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RewriterConfig {
    /// Ollama API endpoint
    #[serde(default = "default_rewriter_endpoint")]
    pub endpoint: String,

    /// Model used for rewriting
    #[serde(default = "default_rewriter_model")]
    pub model: String,

    /// Request timeout in seconds; local models can be slow
    #[serde(rename = "timeout-secs", default = "default_rewriter_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            endpoint: default_rewriter_endpoint(),
            model: default_rewriter_model(),
            timeout_secs: default_rewriter_timeout_secs(),
        }
    }
}

/// Relational engine backing a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sqlite,
    Postgres,
}

/// A polled relational source and the output table its results go to
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source identity, unique across the configuration
    pub name: String,

    pub kind: SourceKind,

    /// Database file path (sqlite) or connection string (postgres)
    pub location: String,

    /// Table holding the URLs
    pub table: String,

    /// Column holding the URL values
    pub column: String,

    /// Table receiving scrape results
    #[serde(rename = "output-table", default = "default_output_table")]
    pub output_table: String,

    /// Maximum rows fetched per poll tick
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Seconds between poll ticks
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Whether the cursor survives restarts
    #[serde(rename = "persist-cursor", default = "default_persist_cursor")]
    pub persist_cursor: bool,
}

impl SourceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_workers() -> u32 {
    8
}

fn default_database_path() -> String {
    "scraped_data.db".to_string()
}

fn default_rewriter_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_rewriter_model() -> String {
    "llama3.2".to_string()
}

fn default_rewriter_timeout_secs() -> u64 {
    300
}

fn default_output_table() -> String {
    "scrape_output".to_string()
}

fn default_batch_size() -> u32 {
    100
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_persist_cursor() -> bool {
    true
}
