//! Page analyzer
//!
//! This module turns a fetched HTML body into a [`PageDocument`]:
//! - Title, viewport, description and keyword tags
//! - Open Graph properties
//! - Anchor targets and image sources, kept as written
//! - JSON-LD structured data blocks
//! - A Markdown rendering of the body with link targets inline

use crate::fetcher::result::{PageDocument, PageMetadata, DEFAULT_TITLE, DEFAULT_VIEWPORT};
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

/// Response context handed to the analyzer alongside the body
#[derive(Debug, Clone, Default)]
pub struct ResponseContext {
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

/// Analyzes an HTML body and builds the normalized document
///
/// # Arguments
///
/// * `html` - The raw document body
/// * `context` - Response headers and cookies to carry into the metadata
///
/// # Example
///
/// ```
/// use scrapeline::fetcher::{analyze, ResponseContext};
///
/// let html = "<html><head><title>Test</title></head><body><a href=\"/a\">A</a></body></html>";
/// let document = analyze(html, ResponseContext::default());
/// assert_eq!(document.metadata.title, "Test");
/// assert_eq!(document.metadata.links, vec!["/a".to_string()]);
/// ```
pub fn analyze(html: &str, context: ResponseContext) -> PageDocument {
    let mut metadata = extract_metadata(html);
    metadata.headers = context.headers;
    metadata.cookies = context.cookies;

    PageDocument {
        markdown: convert_to_markdown(html),
        html: html.to_string(),
        metadata,
    }
}

/// Extracts the document-level metadata from an HTML body
///
/// Headers and cookies are left empty; they come from the response.
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    PageMetadata {
        title: extract_title(&document).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        viewport: meta_content(&document, "viewport")
            .unwrap_or_else(|| DEFAULT_VIEWPORT.to_string()),
        description: meta_content(&document, "description").unwrap_or_default(),
        keywords: meta_content(&document, "keywords").unwrap_or_default(),
        open_graph: extract_open_graph(&document),
        links: collect_attr(&document, "a[href]", "href"),
        images: collect_attr(&document, "img[src]", "src"),
        structured_data: extract_structured_data(&document),
        headers: BTreeMap::new(),
        cookies: BTreeMap::new(),
    }
}

/// Converts HTML to Markdown, falling back to the visible text
pub fn convert_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|e| {
        debug!("Markdown conversion failed, using plain text: {}", e);
        Html::parse_document(html)
            .root_element()
            .text()
            .collect::<String>()
    })
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn meta_content(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[name=\"{}\"][content]", name)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
}

fn extract_open_graph(document: &Html) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[property^=\"og:\"][content]") else {
        return properties;
    };

    for el in document.select(&selector) {
        if let (Some(property), Some(content)) =
            (el.value().attr("property"), el.value().attr("content"))
        {
            properties.insert(property.to_string(), content.to_string());
        }
    }
    properties
}

fn collect_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|value| value.to_string())
        .collect()
}

/// Parses every JSON-LD block; a block that is not valid JSON is kept as its
/// raw text
fn extract_structured_data(document: &Html) -> Vec<serde_json::Value> {
    let Ok(selector) = Selector::parse("script[type=\"application/ld+json\"]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|el| {
            let raw = el.text().collect::<String>();
            let raw = raw.trim();
            serde_json::from_str(raw).unwrap_or_else(|e| {
                debug!("Keeping malformed JSON-LD block as text: {}", e);
                serde_json::Value::String(raw.to_string())
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
<head>
  <title>Catalog</title>
  <meta name="viewport" content="width=320">
  <meta name="description" content="A small catalog">
  <meta name="keywords" content="books, maps">
  <meta property="og:title" content="Catalog OG">
  <meta property="og:type" content="website">
  <script type="application/ld+json">{"@type": "WebSite", "name": "Catalog"}</script>
</head>
<body>
  <a href="/first">First</a>
  <a href="https://other.test/second">Second</a>
  <img src="/logo.png">
</body>
</html>"#;

    #[test]
    fn test_extracts_metadata() {
        let metadata = extract_metadata(PAGE);

        assert_eq!(metadata.title, "Catalog");
        assert_eq!(metadata.viewport, "width=320");
        assert_eq!(metadata.description, "A small catalog");
        assert_eq!(metadata.keywords, "books, maps");
        assert_eq!(metadata.links, vec!["/first", "https://other.test/second"]);
        assert_eq!(metadata.images, vec!["/logo.png"]);
        assert_eq!(metadata.structured_data.len(), 1);
        assert_eq!(metadata.structured_data[0]["@type"], "WebSite");
        assert_eq!(metadata.open_graph.get("og:title").unwrap(), "Catalog OG");
        assert_eq!(metadata.open_graph.len(), 2);
    }

    #[test]
    fn test_defaults_for_missing_title_and_viewport() {
        let metadata = extract_metadata("<html><head></head><body>hi</body></html>");

        assert_eq!(metadata.title, DEFAULT_TITLE);
        assert_eq!(metadata.viewport, DEFAULT_VIEWPORT);
        assert!(metadata.description.is_empty());
        assert!(metadata.links.is_empty());
    }

    #[test]
    fn test_blank_title_uses_default() {
        let metadata = extract_metadata("<html><head><title>   </title></head></html>");
        assert_eq!(metadata.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_malformed_json_ld_kept_as_text() {
        let html = r#"<html><head>
<script type="application/ld+json"> {not json </script>
<script type="application/ld+json">[1, 2]</script>
</head></html>"#;
        let metadata = extract_metadata(html);
        assert_eq!(
            metadata.structured_data,
            vec![
                serde_json::Value::String("{not json".to_string()),
                serde_json::json!([1, 2])
            ]
        );
    }

    #[test]
    fn test_markdown_keeps_link_targets() {
        let markdown = convert_to_markdown(r#"<p>See <a href="https://a.test/x">this</a></p>"#);
        assert!(markdown.contains("https://a.test/x"));
        assert!(markdown.contains("this"));
    }

    #[test]
    fn test_analyze_carries_response_context() {
        let mut context = ResponseContext::default();
        context
            .headers
            .insert("content-type".to_string(), "text/html".to_string());
        context
            .cookies
            .insert("session".to_string(), "abc".to_string());

        let document = analyze(PAGE, context);

        assert_eq!(document.metadata.headers["content-type"], "text/html");
        assert_eq!(document.metadata.cookies["session"], "abc");
        assert_eq!(document.html, PAGE);
        assert!(!document.markdown.is_empty());
    }
}
