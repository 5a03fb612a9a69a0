//! Crawl statistics
//!
//! A `CrawlSummary` is taken from the controller once the crawl completes
//! (or at any point for a progress snapshot).

use crate::state::{CrawlState, CrawlStatus};
use std::collections::BTreeMap;
use std::time::Duration;

/// Aggregate statistics for one crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub status: CrawlStatus,

    /// Completion events published
    pub pages_completed: u64,

    /// Completions that carried a fetch error
    pub pages_failed: u64,

    /// Distinct URLs whose fetch was attempted
    pub pages_visited: u64,

    /// Unique URLs the frontier accepted, seed included
    pub urls_discovered: u64,

    /// URLs still queued when the crawl ended
    pub frontier_remaining: u64,

    /// HTTP status code counts
    pub status_codes: BTreeMap<u16, u64>,

    /// Wall time from start to the moment the summary was taken
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Builds a summary from the controller's state and frontier counters
    pub fn from_state(
        state: &CrawlState,
        urls_discovered: u64,
        frontier_remaining: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            status: state.status,
            pages_completed: state.pages_completed,
            pages_failed: state.pages_failed,
            pages_visited: state.visited.len() as u64,
            urls_discovered,
            frontier_remaining,
            status_codes: state.status_codes.clone(),
            elapsed,
        }
    }

    /// Summary of a crawl that never started
    pub fn empty(status: CrawlStatus) -> Self {
        Self {
            status,
            pages_completed: 0,
            pages_failed: 0,
            pages_visited: 0,
            urls_discovered: 0,
            frontier_remaining: 0,
            status_codes: BTreeMap::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn pages_succeeded(&self) -> u64 {
        self.pages_completed.saturating_sub(self.pages_failed)
    }

    /// Calculates the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_completed == 0 {
            0.0
        } else {
            (self.pages_succeeded() as f64 / self.pages_completed as f64) * 100.0
        }
    }

    /// Pages completed per second of wall time
    pub fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.pages_completed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!("  Status: {}", summary.status);
    println!("  Pages completed: {}", summary.pages_completed);
    println!("  Pages failed: {}", summary.pages_failed);
    println!("  URLs discovered: {}", summary.urls_discovered);
    println!("  Left in frontier: {}", summary.frontier_remaining);
    println!(
        "  Elapsed: {:.2}s ({:.2} pages/sec)",
        summary.elapsed.as_secs_f64(),
        summary.pages_per_second()
    );
    println!();

    if !summary.status_codes.is_empty() {
        println!("HTTP Status Codes:");
        for (code, count) in &summary.status_codes {
            println!("  {}: {}", code, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched successfully)",
        summary.success_rate(),
        summary.pages_succeeded(),
        summary.pages_completed
    );
}
