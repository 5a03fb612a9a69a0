use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Crawl
///
/// A configuration is an immutable snapshot: the controller wraps it in an
/// `Arc` when a crawl starts and every component reads the same values for
/// the lifetime of that crawl.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CrawlConfiguration {
    pub crawler: CrawlerConfig,
    pub rendering: RenderingConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages to fetch (0 = unbounded)
    #[serde(rename = "max-pages-to-crawl")]
    pub max_pages_to_crawl: u64,

    /// Number of concurrent fetch workers
    #[serde(rename = "max-concurrent-workers")]
    pub max_concurrent_workers: u32,

    /// Maximum link depth from the seed URL (the seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages fetched per host (0 = unbounded)
    #[serde(rename = "max-pages-per-host")]
    pub max_pages_per_host: u32,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "politeness-delay-millis")]
    pub politeness_delay_millis: u64,

    /// Per-fetch timeout (milliseconds)
    #[serde(rename = "fetch-timeout-millis")]
    pub fetch_timeout_millis: u64,

    /// Whether links pointing away from the seed host are followed
    #[serde(rename = "crawl-external-pages")]
    pub crawl_external_pages: bool,

    /// Whether robots.txt is fetched and obeyed
    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_millis)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_millis)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages_to_crawl: 1000,
            max_concurrent_workers: 10,
            max_depth: 100,
            max_pages_per_host: 0,
            politeness_delay_millis: 0,
            fetch_timeout_millis: 15_000,
            crawl_external_pages: false,
            respect_robots_txt: false,
        }
    }
}

/// Client-side rendering configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Ask the fetch transport to execute page scripts
    #[serde(rename = "javascript-rendering-enabled")]
    pub javascript_rendering_enabled: bool,

    /// Time to let client-side content settle before capture (milliseconds)
    #[serde(rename = "render-wait-millis")]
    pub render_wait_millis: u64,
}

impl RenderingConfig {
    /// Returns the settle delay, only when rendering is enabled
    pub fn render_wait(&self) -> Option<Duration> {
        if self.javascript_rendering_enabled && self.render_wait_millis > 0 {
            Some(Duration::from_millis(self.render_wait_millis))
        } else {
            None
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiCrawl".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_wait_requires_rendering() {
        let mut rendering = RenderingConfig {
            javascript_rendering_enabled: false,
            render_wait_millis: 3000,
        };
        assert_eq!(rendering.render_wait(), None);

        rendering.javascript_rendering_enabled = true;
        assert_eq!(rendering.render_wait(), Some(Duration::from_millis(3000)));

        rendering.render_wait_millis = 0;
        assert_eq!(rendering.render_wait(), None);
    }

    #[test]
    fn test_user_agent_header() {
        let mut ua = UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "2.1".to_string(),
            contact_url: None,
        };
        assert_eq!(ua.header_value(), "TestBot/2.1");

        ua.contact_url = Some("https://example.com/bot".to_string());
        assert_eq!(ua.header_value(), "TestBot/2.1 (+https://example.com/bot)");
    }
}
