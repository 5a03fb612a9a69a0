//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Aggregate crawl statistics
//! - Printing a summary to stdout
//! - Writing a markdown report

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use stats::{print_summary, CrawlSummary};
