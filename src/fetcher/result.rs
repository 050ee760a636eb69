use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Title recorded when a fetched page has no `<title>`
pub const DEFAULT_TITLE: &str = "No Title";

/// Viewport recorded when a fetched page declares none
pub const DEFAULT_VIEWPORT: &str = "width=device-width, initial-scale=1";

/// Metadata extracted from a fetched page
///
/// Every field is empty when the fetch failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub viewport: String,
    pub description: String,
    pub keywords: String,
    /// `og:*` properties keyed by their full property name
    pub open_graph: BTreeMap<String, String>,
    /// Anchor targets as written in the document
    pub links: Vec<String>,
    /// Image sources as written in the document
    pub images: Vec<String>,
    /// Parsed JSON-LD blocks
    pub structured_data: Vec<serde_json::Value>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

/// Normalized content of a fetched page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    /// Markdown rendering with link targets inline
    pub markdown: String,
    /// Raw document body
    pub html: String,
    pub metadata: PageMetadata,
}

/// Outcome of one fetch attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Unique per attempt
    pub scrape_id: String,
    pub requested_url: String,
    pub final_url: String,
    /// Absent on transport failure
    pub status_code: Option<u16>,
    pub document: PageDocument,
    pub error: Option<String>,
}

impl ScrapeResult {
    /// Builds a result for a successful fetch
    pub fn success(
        requested_url: &str,
        final_url: &str,
        status_code: u16,
        document: PageDocument,
    ) -> Self {
        Self {
            scrape_id: new_scrape_id(),
            requested_url: requested_url.to_string(),
            final_url: final_url.to_string(),
            status_code: Some(status_code),
            document,
            error: None,
        }
    }

    /// Builds a result for a fetch that produced no response
    pub fn failure(requested_url: &str, error: impl Into<String>) -> Self {
        Self {
            scrape_id: new_scrape_id(),
            requested_url: requested_url.to_string(),
            final_url: requested_url.to_string(),
            status_code: None,
            document: PageDocument::default(),
            error: Some(error.into()),
        }
    }

    /// Builds a result for a response that signaled failure
    pub fn http_failure(requested_url: &str, final_url: &str, status_code: u16) -> Self {
        Self {
            scrape_id: new_scrape_id(),
            requested_url: requested_url.to_string(),
            final_url: final_url.to_string(),
            status_code: Some(status_code),
            document: PageDocument::default(),
            error: Some(format!("HTTP {}", status_code)),
        }
    }

    /// True when the job owning this result should be Completed
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status_code == Some(200)
    }
}

fn new_scrape_id() -> String {
    Uuid::new_v4().to_string()
}
