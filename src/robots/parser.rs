//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate. Crawl-delay
//! is not part of the matcher's model, so it is read from the groups here.

use robotstxt::DefaultMatcher;
use std::time::Duration;
use url::Url;

/// Parsed robots.txt data for one host
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Returns true if nothing is restricted
    pub fn is_allow_all(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user agent token
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The crawler's product token (e.g. "SumiCrawl")
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url.as_str())
    }

    /// Gets the crawl delay that applies to a user agent token
    ///
    /// A group naming the agent wins over the `*` group. Values are seconds
    /// and may be fractional; negative or unparsable values are ignored.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        if self.is_allow_all() {
            return None;
        }

        let agent = user_agent.to_ascii_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut group_open = false;
        let mut for_wildcard: Option<f64> = None;
        let mut for_agent: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_ascii_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    if !seconds.is_finite() || seconds < 0.0 {
                        continue;
                    }
                    let names_agent = group
                        .iter()
                        .any(|ua| !ua.is_empty() && ua != "*" && agent.starts_with(ua.as_str()));
                    if names_agent {
                        for_agent = Some(seconds);
                    } else if group.iter().any(|ua| ua == "*") {
                        for_wildcard = Some(seconds);
                    }
                }
                _ => group_open = false,
            }
        }

        for_agent.or(for_wildcard).map(Duration::from_secs_f64)
    }
}
