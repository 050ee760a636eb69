use crate::config::FetcherConfig;
use crate::fetcher::analyzer::{analyze, ResponseContext};
use crate::fetcher::client::build_http_client;
use crate::fetcher::result::ScrapeResult;
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use tracing::debug;

/// Fetches one URL and converts it into a [`ScrapeResult`]
///
/// Holds no mutable state; clones share the underlying connection pool and can
/// fetch distinct URLs concurrently.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Creates a fetcher with the browser-like client profile
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches and analyzes a page
    ///
    /// Never fails: timeouts, network errors, non-2xx responses and body read
    /// errors all come back as a result with `error` set and empty metadata.
    ///
    /// | Condition | status_code | error |
    /// |-----------|-------------|-------|
    /// | 2xx | Some(code) | None |
    /// | Other status | Some(code) | `HTTP <code>` |
    /// | Transport or body failure | None | error text |
    pub async fn fetch(&self, url: &str) -> ScrapeResult {
        debug!("Fetching {}", url);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return ScrapeResult::failure(url, describe_error(&e)),
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            debug!("{} returned HTTP {}", url, status.as_u16());
            return ScrapeResult::http_failure(url, &final_url, status.as_u16());
        }

        // Cookies and headers must be read before the body consumes the response
        let context = response_context(&response);

        match response.text().await {
            Ok(body) => {
                let document = analyze(&body, context);
                ScrapeResult::success(url, &final_url, status.as_u16(), document)
            }
            Err(e) => ScrapeResult::failure(url, describe_error(&e)),
        }
    }
}

fn response_context(response: &Response) -> ResponseContext {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in response.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let cookies = response
        .cookies()
        .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
        .collect();

    ResponseContext { headers, cookies }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timeout: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_redirect() {
        format!("Redirect error: {}", e)
    } else {
        e.to_string()
    }
}
