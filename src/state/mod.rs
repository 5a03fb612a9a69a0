//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStatus` / `CrawlState`: the controller's lifecycle and counters
//! - `HostState`: per-host politeness bookkeeping used by the frontier

mod crawl_state;
mod host_state;

pub use crawl_state::{CrawlState, CrawlStatus};
pub use host_state::HostState;
