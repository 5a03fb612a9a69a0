//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating, politeness-aware frontier
//! - Pluggable page fetching behind the `Fetcher` trait
//! - HTML parsing and link extraction
//! - The fixed-size worker pool
//! - Crawl lifecycle control and completion events

mod controller;
mod events;
mod fetcher;
mod frontier;
mod parser;
mod pool;
mod processor;

pub use controller::{run_crawl, CrawlController};
pub use events::{CompletionStream, EventBus};
pub use fetcher::{build_http_client, FetchError, FetchRequest, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use parser::{parse_html, ParseError, ParsedPage};
pub use processor::{CrawlResult, PageProcessor, ProcessedPage};
