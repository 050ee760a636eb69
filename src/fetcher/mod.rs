//! Page fetcher
//!
//! This module performs one HTTP fetch per URL and converts the response into
//! a normalized document with metadata.
//!
//! # Components
//!
//! - `client`: Browser-like `reqwest` client profile
//! - `PageFetcher`: Fetch contract that never fails
//! - `analyzer`: HTML metadata extraction and Markdown conversion
//! - `ScrapeResult`: Outcome of one fetch attempt

mod analyzer;
mod client;
mod page_fetcher;
mod result;

pub use analyzer::{analyze, convert_to_markdown, extract_metadata, ResponseContext};
pub use client::{build_http_client, resolve_user_agent, MAX_REDIRECTS};
pub use page_fetcher::PageFetcher;
pub use result::{PageDocument, PageMetadata, ScrapeResult, DEFAULT_TITLE, DEFAULT_VIEWPORT};
