//! Sumi-Crawl: a polite concurrent web crawler core
//!
//! This crate implements a crawler built from a deduplicating, politeness-aware
//! frontier, a bounded pool of fetch workers, a page processor that feeds
//! discovered links back into the frontier, and a controller that owns the
//! crawl lifecycle and publishes one completion event per attempted fetch.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid crawl transition: {from} -> {to}")]
    InvalidTransition {
        from: state::CrawlStatus,
        to: state::CrawlStatus,
    },

    #[error("Crawl has not been started")]
    NotStarted,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::CrawlConfiguration;
pub use crawler::{
    run_crawl, CompletionStream, CrawlController, FetchError, Fetcher, ProcessedPage,
};
pub use output::CrawlSummary;
pub use state::{CrawlState, CrawlStatus};
pub use url::{extract_domain, normalize_url};
