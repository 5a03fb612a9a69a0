//! HTTP fetcher implementation
//!
//! This module handles all page retrieval for the crawler, including:
//! - The `Fetcher` trait, the narrow seam behind which transports live
//! - Building HTTP clients with proper user agent strings
//! - GET requests with an optional settle delay before capture
//! - Error classification

use crate::config::CrawlConfiguration;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one fetch
const MAX_REDIRECTS: usize = 10;

/// A single page retrieval request
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// The URL to fetch
    pub url: Url,

    /// Whether the transport should execute page scripts
    pub render_javascript: bool,

    /// How long to let client-side content settle before capturing it
    pub render_wait: Option<Duration>,
}

impl FetchRequest {
    /// A plain request with no rendering
    pub fn plain(url: Url) -> Self {
        Self {
            url,
            render_javascript: false,
            render_wait: None,
        }
    }
}

/// A successfully retrieved page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value (empty if absent)
    pub content_type: String,

    /// Page body content
    pub body: String,
}

/// Why a fetch did not produce a page
///
/// Fetch errors never abort a worker: they are recorded on the result and
/// delivered to subscribers with the completion event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Returns the HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// Classifies a reqwest error
    pub fn from_reqwest(error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                millis: timeout.as_millis() as u64,
            }
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_body() || error.is_decode() {
            Self::Body(error.to_string())
        } else {
            Self::Request(error.to_string())
        }
    }
}

/// A transport capable of retrieving pages
///
/// `HttpFetcher` is the built-in implementation. Transports that execute
/// scripts implement this trait and honor `FetchRequest::render_javascript`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::config::CrawlConfiguration;
/// use sumi_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlConfiguration::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlConfiguration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .connect_timeout(config.crawler.fetch_timeout().min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP(S) with reqwest
///
/// This transport does not execute scripts. The fetch timeout bounds the
/// request and the body read separately; a requested render wait runs
/// between the two and is not charged against either.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfiguration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            timeout: config.crawler.fetch_timeout(),
        })
    }

    fn timed_out(&self) -> FetchError {
        FetchError::Timeout {
            millis: self.timeout.as_millis() as u64,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let send = self.client.get(request.url.clone()).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|e| FetchError::from_reqwest(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if let Some(wait) = request.render_wait {
            tracing::trace!("Waiting {:?} for {} to settle", wait, final_url);
            tokio::time::sleep(wait).await;
        }

        let body = tokio::time::timeout(self.timeout, response.text())
            .await
            .map_err(|_| self.timed_out())?
            .map_err(|e| FetchError::from_reqwest(&e, self.timeout))?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        })
    }
}
