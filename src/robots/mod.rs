//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. When enabled, workers consult `RobotsPolicy` before
//! reserving a page slot; disallowed URLs are never fetched.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use crate::crawler::{FetchRequest, Fetcher};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// The answer for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsVerdict {
    pub allowed: bool,

    /// Crawl-delay that applies to this crawler on the URL's host
    pub crawl_delay: Option<Duration>,

    /// When robots.txt was requested from the host to answer this check,
    /// or None if the answer came from the cache
    pub requested_at: Option<Instant>,
}

/// Builds the robots.txt URL for the origin of `url`
///
/// Returns None for URLs without a host.
pub fn robots_url(url: &Url) -> Option<Url> {
    url.host_str()?;
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    Some(robots)
}

/// Fetches and caches robots.txt per origin
///
/// Any fetch failure, including a 4xx or 5xx status, is treated as
/// "allow all" for that origin.
pub struct RobotsPolicy {
    fetcher: Arc<dyn Fetcher>,
    cache: RobotsCache,
    agent_token: String,
}

impl RobotsPolicy {
    /// Creates a policy matching groups against `agent_token` (the crawler name)
    pub fn new(fetcher: Arc<dyn Fetcher>, agent_token: impl Into<String>) -> Self {
        Self {
            fetcher,
            cache: RobotsCache::new(),
            agent_token: agent_token.into(),
        }
    }

    /// Checks whether `url` may be fetched
    pub async fn check(&self, url: &Url) -> RobotsVerdict {
        let (robots, requested_at) = self.robots_for(url).await;
        RobotsVerdict {
            allowed: robots.is_allowed(url, &self.agent_token),
            crawl_delay: robots.crawl_delay(&self.agent_token),
            requested_at,
        }
    }

    async fn robots_for(&self, url: &Url) -> (ParsedRobots, Option<Instant>) {
        let Some(robots_url) = robots_url(url) else {
            return (ParsedRobots::allow_all(), None);
        };
        let origin = url.origin().ascii_serialization();

        if let Some(cached) = self.cache.get(&origin) {
            tracing::trace!("Using cached robots.txt for {}", origin);
            return (cached, None);
        }

        tracing::debug!("Fetching {}", robots_url);
        let requested_at = Instant::now();
        let robots = match self.fetcher.fetch(&FetchRequest::plain(robots_url)).await {
            Ok(page) => ParsedRobots::from_content(&page.body),
            Err(e) => {
                tracing::debug!("No usable robots.txt for {}: {}", origin, e);
                ParsedRobots::allow_all()
            }
        };

        self.cache.insert(&origin, robots.clone());
        (robots, Some(requested_at))
    }

    /// Number of origins with a cached robots.txt
    pub fn cached_origins(&self) -> usize {
        self.cache.len()
    }
}
