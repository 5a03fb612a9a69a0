//! Crawl frontier: the shared queue of URLs waiting to be fetched
//!
//! This module handles:
//! - Deduplication of every URL ever enqueued during the crawl
//! - FIFO dispatch to workers, deferring hosts that are inside their politeness delay
//! - Per-host page limits and robots.txt crawl delays
//! - Closing, either explicitly or when the crawl runs out of work

use crate::config::CrawlerConfig;
use crate::state::HostState;
use crate::url::{extract_domain, normalize_parsed};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    /// The normalized URL to fetch
    pub url: Url,

    /// Link distance from the seed (the seed is 0)
    pub depth: u32,

    /// Host key used for politeness tracking
    pub host: String,

    /// When the URL was first enqueued
    pub discovered_at: DateTime<Utc>,
}

/// Outcome of one scan over the queue
enum NextEntry {
    Ready(FrontierEntry),
    Wait(Duration),
    Empty,
    Closed,
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<FrontierEntry>,
    seen: HashSet<String>,
    hosts: HashMap<String, HostState>,
    in_flight: usize,
    closed: bool,
}

impl FrontierState {
    /// Takes the first entry whose host may be fetched now
    ///
    /// Hosts over their page limit have their entries dropped. The chosen
    /// host's dispatch time is recorded before the lock is released, which
    /// is what keeps two workers from hitting one host inside its delay.
    fn next_ready(&mut self, config: &CrawlerConfig, now: Instant) -> NextEntry {
        if self.closed {
            return NextEntry::Closed;
        }

        let mut min_wait: Option<Duration> = None;
        let mut index = 0;

        while index < self.queue.len() {
            let host = self.queue[index].host.clone();
            let state = self.hosts.entry(host).or_default();

            if state.has_exceeded_limit(config) {
                if let Some(dropped) = self.queue.remove(index) {
                    tracing::debug!(
                        "Dropping {}: host {} reached its page limit",
                        dropped.url,
                        dropped.host
                    );
                }
                continue;
            }

            match state.time_until_next_request(config, now) {
                None => {
                    state.record_request(now);
                    if let Some(entry) = self.queue.remove(index) {
                        self.in_flight += 1;
                        return NextEntry::Ready(entry);
                    }
                }
                Some(wait) => {
                    tracing::trace!(
                        "Deferring {} for {:?} (politeness)",
                        self.queue[index].url,
                        wait
                    );
                    min_wait = Some(min_wait.map_or(wait, |current| current.min(wait)));
                    index += 1;
                }
            }
        }

        if let Some(wait) = min_wait {
            return NextEntry::Wait(wait);
        }

        if self.in_flight == 0 {
            tracing::info!("Frontier exhausted after {} unique URLs", self.seen.len());
            self.closed = true;
            return NextEntry::Closed;
        }

        NextEntry::Empty
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }
}

/// Thread-safe, deduplicating crawl frontier
///
/// The frontier is the only mutable structure workers share directly. The
/// dedupe check, the queue and the per-host politeness state are guarded by
/// one mutex so that a URL can never be dispatched twice.
pub struct Frontier {
    config: CrawlerConfig,
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    /// Creates an empty, open frontier
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a URL unless it has been seen before
    ///
    /// The URL is normalized first. Duplicates, unsupported URLs and
    /// enqueues after `close()` are silent no-ops.
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued
    /// * `false` - The URL was ignored
    pub fn enqueue(&self, url: Url, depth: u32) -> bool {
        let url = match normalize_parsed(url) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Not enqueueing URL: {}", e);
                return false;
            }
        };
        let Some(host) = extract_domain(&url) else {
            return false;
        };

        {
            let mut state = self.lock();
            if state.closed {
                tracing::trace!("Frontier closed, ignoring {}", url);
                return false;
            }
            if !state.seen.insert(url.as_str().to_string()) {
                tracing::trace!("Already seen {}", url);
                return false;
            }

            tracing::debug!("Enqueued {} at depth {}", url, depth);
            state.queue.push_back(FrontierEntry {
                url,
                depth,
                host,
                discovered_at: Utc::now(),
            });
        }

        self.notify.notify_one();
        true
    }

    /// Waits for the next entry that may be fetched
    ///
    /// Blocks until an entry is ready or the frontier is closed. Entries for
    /// hosts inside their politeness delay are deferred, not dropped: the
    /// caller sleeps until the earliest host becomes ready or new work
    /// arrives.
    ///
    /// # Returns
    ///
    /// * `Some(FrontierEntry)` - An entry to fetch; call `finish()` when done
    /// * `None` - The frontier is closed
    pub async fn dequeue(&self) -> Option<FrontierEntry> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = self.lock().next_ready(&self.config, Instant::now());

            match next {
                NextEntry::Ready(entry) => {
                    tracing::debug!("Dispatching {}", entry.url);
                    return Some(entry);
                }
                NextEntry::Closed => {
                    self.notify.notify_waiters();
                    return None;
                }
                NextEntry::Wait(wait) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                NextEntry::Empty => notified.await,
            }
        }
    }

    /// Marks a dequeued entry as done
    ///
    /// Must be called once per entry returned by `dequeue()`, after any links
    /// it produced have been enqueued. When nothing is queued or in flight
    /// afterwards, the frontier closes itself.
    pub fn finish(&self) {
        let exhausted = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            if !state.closed && state.is_exhausted() {
                tracing::info!("Frontier exhausted after {} unique URLs", state.seen.len());
                state.closed = true;
                true
            } else {
                false
            }
        };

        if exhausted {
            self.notify.notify_waiters();
        } else {
            // A finished host may now be inside its delay window rather than
            // blocked on in-flight work; let a waiter re-scan.
            self.notify.notify_one();
        }
    }

    /// Closes the frontier; pending and future `dequeue()` calls return None
    pub fn close(&self) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }
        tracing::debug!("Frontier closed");
        self.notify.notify_waiters();
    }

    /// Applies a robots.txt crawl delay to a host
    pub fn set_crawl_delay(&self, host: &str, delay: Duration) {
        let mut state = self.lock();
        state
            .hosts
            .entry(host.to_string())
            .or_default()
            .set_crawl_delay(delay);
    }

    /// Accounts for an extra request a worker sent to `host` at `sent_at`
    ///
    /// Returns how long the worker must wait before fetching the entry it
    /// holds for that host. Later dispatches to the host are spaced from the
    /// deferred fetch.
    pub fn defer_dispatch(&self, host: &str, sent_at: Instant) -> Duration {
        let wait = {
            let mut state = self.lock();
            state
                .hosts
                .entry(host.to_string())
                .or_default()
                .defer_dispatch(&self.config, sent_at, Instant::now())
        };
        if !wait.is_zero() {
            tracing::trace!("Deferring fetch to {} by {:?}", host, wait);
        }
        wait
    }

    /// Returns true if the frontier has been closed
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the number of URLs waiting to be dispatched
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns whether no URL is waiting to be dispatched
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Returns the number of unique URLs ever enqueued
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Returns true if the URL (after normalization) has been enqueued before
    pub fn has_seen(&self, url: &Url) -> bool {
        match normalize_parsed(url.clone()) {
            Ok(normalized) => self.lock().seen.contains(normalized.as_str()),
            Err(_) => false,
        }
    }

    /// Returns the number of dequeued entries not yet finished
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }
}
