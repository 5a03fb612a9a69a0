//! Per-host robots.txt cache
//!
//! Entries expire after 24 hours so long crawls pick up changes made by the
//! site owner.

use crate::robots::ParsedRobots;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// How long a fetched robots.txt stays valid
const ROBOTS_TTL_HOURS: i64 = 24;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is older than the TTL
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(ROBOTS_TTL_HOURS)
    }

    /// Returns how long ago the robots.txt was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Thread-safe map of host origin to robots.txt
///
/// The lock is only held for lookups and inserts, never across a fetch.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached robots.txt for an origin if it is still fresh
    pub fn get(&self, origin: &str) -> Option<ParsedRobots> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(origin)
            .filter(|cached| !cached.is_stale())
            .map(|cached| cached.content.clone())
    }

    pub fn insert(&self, origin: &str, robots: ParsedRobots) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(origin.to_string(), CachedRobots::new(robots));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
