//! Page processing: turns a fetch result into a completion event
//!
//! The processor extracts text and links, feeds links that pass the depth
//! and host-scope filters back into the frontier, and publishes the event.

use crate::config::CrawlConfiguration;
use crate::crawler::events::EventBus;
use crate::crawler::fetcher::FetchError;
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::parse_html;
use crate::url::is_same_host;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use url::Url;

/// Raw outcome of one fetch attempt, produced by a worker
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The URL that was dequeued
    pub url: Url,

    pub depth: u32,

    /// URL after redirects, when the server answered
    pub final_url: Option<Url>,

    pub http_status: Option<u16>,

    pub content_type: String,

    pub body: String,

    pub elapsed_millis: u64,

    pub error: Option<FetchError>,
}

impl CrawlResult {
    /// A result for a fetch that failed before producing a page
    pub fn failed(entry: &FrontierEntry, error: FetchError, elapsed_millis: u64) -> Self {
        Self {
            url: entry.url.clone(),
            depth: entry.depth,
            final_url: None,
            http_status: error.status_code(),
            content_type: String::new(),
            body: String::new(),
            elapsed_millis,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    fn is_html(&self) -> bool {
        let content_type = self.content_type.to_ascii_lowercase();
        content_type.is_empty() || content_type.contains("html")
    }
}

/// The completion event delivered to subscribers
///
/// Exactly one is published per attempted fetch, including failed ones.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub url: Url,
    pub depth: u32,
    pub http_status: Option<u16>,

    /// Plain text of the page, whitespace collapsed
    pub content_text: String,

    pub title: Option<String>,

    /// Every http(s) link found on the page, before filtering
    pub discovered_links: Vec<Url>,

    /// How many of the discovered links were new to the frontier
    pub links_enqueued: usize,

    pub elapsed_millis: u64,
    pub error: Option<FetchError>,
    pub parse_error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ProcessedPage {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if the page text contains `needle`
    pub fn text_contains(&self, needle: &str) -> bool {
        self.content_text.contains(needle)
    }
}

/// Extracts content, re-feeds the frontier and publishes completion events
pub struct PageProcessor {
    frontier: Arc<Frontier>,
    config: Arc<CrawlConfiguration>,
    seed: Url,
    events: Arc<EventBus>,
}

impl PageProcessor {
    pub fn new(
        frontier: Arc<Frontier>,
        config: Arc<CrawlConfiguration>,
        seed: Url,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            frontier,
            config,
            seed,
            events,
        }
    }

    /// Processes one fetch result and publishes its completion event
    pub fn process(&self, result: CrawlResult) -> Arc<ProcessedPage> {
        let page = Arc::new(self.build_page(result));
        self.events.publish(page.clone());
        page
    }

    fn build_page(&self, result: CrawlResult) -> ProcessedPage {
        let mut page = ProcessedPage {
            url: result.url.clone(),
            depth: result.depth,
            http_status: result.http_status,
            content_text: String::new(),
            title: None,
            discovered_links: Vec::new(),
            links_enqueued: 0,
            elapsed_millis: result.elapsed_millis,
            error: result.error.clone(),
            parse_error: None,
            completed_at: Utc::now(),
        };

        if let Some(error) = &result.error {
            tracing::warn!("Failed to fetch {}: {}", result.url, error);
            return page;
        }

        if !result.is_html() {
            tracing::debug!(
                "{} is {}, keeping text without links",
                result.url,
                result.content_type
            );
            page.content_text = result.body.trim().to_string();
            return page;
        }

        let base = result.final_url.as_ref().unwrap_or(&result.url);
        match parse_html(&result.body, base) {
            Ok(parsed) => {
                page.title = parsed.title;
                page.content_text = parsed.text;
                page.links_enqueued = self.enqueue_links(&parsed.links, result.depth);
                page.discovered_links = parsed.links;
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", result.url, e);
                page.content_text = result.body.trim().to_string();
                page.parse_error = Some(e.to_string());
            }
        }

        tracing::debug!(
            "Processed {}: {} links found, {} enqueued",
            page.url,
            page.discovered_links.len(),
            page.links_enqueued
        );
        page
    }

    fn enqueue_links(&self, links: &[Url], depth: u32) -> usize {
        let child_depth = depth.saturating_add(1);
        if child_depth > self.config.crawler.max_depth {
            tracing::trace!("Depth limit reached at depth {}", depth);
            return 0;
        }

        links
            .iter()
            .filter(|link| {
                let follow =
                    self.config.crawler.crawl_external_pages || is_same_host(&self.seed, link);
                if !follow {
                    tracing::trace!("Skipping external link {}", link);
                }
                follow
            })
            .filter(|link| self.frontier.enqueue((*link).clone(), child_depth))
            .count()
    }
}
