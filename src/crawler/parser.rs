//! HTML parser for extracting links, text and metadata
//!
//! This module handles parsing fetched content to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - A plain-text rendering of the page
//! - Page title

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Elements whose text is never part of the rendered page text
const NON_CONTENT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Content that could not be parsed into links
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Cannot resolve links against {url}: not a hierarchical URL")]
    InvalidBase { url: String },

    #[error("Invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text with whitespace collapsed
    pub text: String,

    /// All links found on the page (absolute, http/https only)
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts links, text and title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// Links are deduplicated in document order.
///
/// # Example
///
/// ```
/// use sumi_crawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url).unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> Result<ParsedPage, ParseError> {
    if base_url.cannot_be_a_base() {
        return Err(ParseError::InvalidBase {
            url: base_url.to_string(),
        });
    }

    let document = Html::parse_document(html);

    Ok(ParsedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url)?,
    })
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = selector("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Extracts the visible text of the body (or the whole document if there is none)
fn extract_text(document: &Html) -> String {
    let body = selector("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .unwrap_or_else(|| document.root_element());

    let mut parts: Vec<&str> = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| NON_CONTENT_ELEMENTS.contains(&el.value().name()));
        if !hidden {
            parts.push(text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Result<Vec<Url>, ParseError> {
    let mut links: Vec<Url> = Vec::new();

    let a_selector = selector("a[href]")?;
    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }
        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if !links.contains(&absolute_url) {
                links.push(absolute_url);
            }
        }
    }

    let canonical_selector = selector("link[rel='canonical'][href]")?;
    for element in document.select(&canonical_selector) {
        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if !links.contains(&absolute_url) {
                links.push(absolute_url);
            }
        }
    }

    Ok(links)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn link_strings(parsed: &ParsedPage) -> Vec<&str> {
        parsed.links.iter().map(|u| u.as_str()).collect()
    }

    #[test]
    fn test_extract_title_with_whitespace() {
        let html = r#"<html><head><title>  Test   Page  </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_text() {
        let html = r#"<html><head><title>T</title></head><body>
            <h1>Dogs</h1>
            <p>Good   dogs
               everywhere</p>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.text, "Dogs Good dogs everywhere");
    }

    #[test]
    fn test_text_skips_scripts_and_styles() {
        let html = r#"<html><body>
            <script>var hidden = "dogs";</script>
            <style>.x { color: red }</style>
            <noscript>enable js</noscript>
            <p>visible</p>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.text, "visible");
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let html = r#"<html><body>
            <a href="https://other.com/page">Abs</a>
            <a href="/other">Root</a>
            <a href="sibling">Rel</a>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(
            link_strings(&parsed),
            vec![
                "https://other.com/page",
                "https://example.com/other",
                "https://example.com/sibling"
            ]
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        let html = r#"<html><body>
            <a href="javascript:void(0)">js</a>
            <a href="JavaScript:alert(1)">js</a>
            <a href="mailto:test@example.com">mail</a>
            <a href="tel:+1234567890">tel</a>
            <a href="data:text/html,<h1>Test</h1>">data</a>
            <a href="ftp://example.com/file">ftp</a>
        </body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_skip_download_and_fragment_links() {
        let html = r##"<html><body>
            <a href="/file.pdf" download>Download</a>
            <a href="#section">Jump</a>
        </body></html>"##;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_extract_canonical_link() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(link_strings(&parsed), vec!["https://example.com/canonical"]);
    }

    #[test]
    fn test_duplicate_links_collapsed() {
        let html = r#"<html><body><a href="/a">1</a><a href="/a">2</a><a href="/b">3</a></body></html>"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(parsed.links.len(), 2);
    }

    #[test]
    fn test_malformed_html_still_parses() {
        let html = r#"<html><body><div><a href="/ok">ok<p>unclosed <b>tags"#;
        let parsed = parse_html(html, &base_url()).unwrap();
        assert_eq!(link_strings(&parsed), vec!["https://example.com/ok"]);
    }

    #[test]
    fn test_plain_text_input_has_no_links() {
        let parsed = parse_html("just some text, no markup", &base_url()).unwrap();
        assert!(parsed.links.is_empty());
        assert_eq!(parsed.text, "just some text, no markup");
    }

    #[test]
    fn test_non_hierarchical_base_is_error() {
        let base = Url::parse("mailto:someone@example.com").unwrap();
        let result = parse_html("<a href='/x'>x</a>", &base);
        assert!(matches!(result, Err(ParseError::InvalidBase { .. })));
    }
}
