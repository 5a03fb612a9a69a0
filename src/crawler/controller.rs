//! Crawl controller - lifecycle and orchestration
//!
//! The controller owns one crawl from start to completion:
//! - Validating configuration and the seed URL
//! - Seeding the frontier and launching the worker pool
//! - Enforcing the global page cap
//! - Publishing completion events to subscribers
//! - Draining workers on stop, cap or exhaustion

use crate::config::{validate, CrawlConfiguration};
use crate::crawler::events::{CompletionStream, EventBus};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::pool::{WorkerContext, WorkerPool};
use crate::crawler::processor::{PageProcessor, ProcessedPage};
use crate::output::CrawlSummary;
use crate::robots::RobotsPolicy;
use crate::state::{CrawlState, CrawlStatus};
use crate::url::normalize_url;
use crate::{CrawlError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct TrackerInner {
    state: CrawlState,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

/// Lifecycle status and counters, shared by the controller and its workers
///
/// Page-slot reservations and completion counting happen under one lock,
/// which is what keeps completions from ever exceeding the page cap.
#[derive(Debug)]
pub(crate) struct CrawlTracker {
    inner: Mutex<TrackerInner>,
    max_pages: u64,
}

impl CrawlTracker {
    pub(crate) fn new(max_pages: u64) -> Self {
        Self {
            inner: Mutex::new(TrackerInner::default()),
            max_pages,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn status(&self) -> CrawlStatus {
        self.lock().state.status
    }

    /// Idle -> Running
    pub(crate) fn begin(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.state.transition(CrawlStatus::Running)?;
        inner.started_at = Some(Instant::now());
        Ok(())
    }

    pub(crate) fn try_begin_page(&self) -> bool {
        self.lock().state.try_begin_page(self.max_pages)
    }

    /// Counts a completion; returns true if the page cap was just reached
    pub(crate) fn record_completion(&self, page: &ProcessedPage) -> bool {
        let mut inner = self.lock();
        let reached = inner.state.record_completion(
            &page.url,
            page.http_status,
            page.error.is_some(),
            self.max_pages,
        );
        if reached && inner.state.status == CrawlStatus::Running {
            tracing::info!("Page limit of {} reached, stopping", self.max_pages);
            // Running -> Stopping is always legal here
            let _ = inner.state.transition(CrawlStatus::Stopping);
        }
        reached
    }

    /// Applies a stop request and returns the status it was applied to
    pub(crate) fn request_stop(&self) -> CrawlStatus {
        let mut inner = self.lock();
        let previous = inner.state.status;
        let next = match previous {
            CrawlStatus::Idle => CrawlStatus::Completed,
            CrawlStatus::Running => CrawlStatus::Stopping,
            CrawlStatus::Stopping | CrawlStatus::Completed => return previous,
        };
        if inner.state.transition(next).is_ok() && next == CrawlStatus::Completed {
            inner.finished_at = Some(Instant::now());
        }
        previous
    }

    /// Drives the crawl to Completed through Stopping; idempotent
    pub(crate) fn complete(&self) {
        let mut inner = self.lock();
        if inner.state.status == CrawlStatus::Running {
            let _ = inner.state.transition(CrawlStatus::Stopping);
        }
        if inner.state.status == CrawlStatus::Stopping {
            let _ = inner.state.transition(CrawlStatus::Completed);
            inner.finished_at = Some(Instant::now());
            tracing::info!(
                "Crawl completed: {} pages ({} failed)",
                inner.state.pages_completed,
                inner.state.pages_failed
            );
        }
    }

    pub(crate) fn pages_completed(&self) -> u64 {
        self.lock().state.pages_completed
    }

    fn snapshot(&self) -> (CrawlState, Duration) {
        let inner = self.lock();
        let elapsed = match (inner.started_at, inner.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        };
        (inner.state.clone(), elapsed)
    }
}

/// Controls one crawl
///
/// A controller runs exactly one crawl: once `Completed` it cannot be
/// restarted. Subscribe before `start()` to see every completion event.
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::{CrawlConfiguration, CrawlController};
///
/// # async fn example() -> sumi_crawl::Result<()> {
/// let controller = CrawlController::new(CrawlConfiguration::default())?;
/// let mut events = controller.subscribe();
/// controller.start("https://example.com/").await?;
///
/// while let Some(page) = events.recv().await {
///     println!("{} -> {:?}", page.url, page.http_status);
/// }
/// let summary = controller.wait().await?;
/// println!("{} pages", summary.pages_completed);
/// # Ok(())
/// # }
/// ```
pub struct CrawlController {
    config: Arc<CrawlConfiguration>,
    fetcher: Arc<dyn Fetcher>,
    events: Arc<EventBus>,
    tracker: Arc<CrawlTracker>,
    frontier: Mutex<Option<Arc<Frontier>>>,
    pool: tokio::sync::Mutex<Option<WorkerPool>>,
}

impl CrawlController {
    /// Creates a controller that fetches over HTTP
    pub fn new(config: CrawlConfiguration) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Creates a controller using a custom transport
    pub fn with_fetcher(config: CrawlConfiguration, fetcher: Arc<dyn Fetcher>) -> Self {
        let max_pages = config.crawler.max_pages_to_crawl;
        Self {
            config: Arc::new(config),
            fetcher,
            events: Arc::new(EventBus::new()),
            tracker: Arc::new(CrawlTracker::new(max_pages)),
            frontier: Mutex::new(None),
            pool: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CrawlConfiguration {
        &self.config
    }

    /// Returns a stream of completion events published from now on
    pub fn subscribe(&self) -> CompletionStream {
        self.events.subscribe()
    }

    pub fn status(&self) -> CrawlStatus {
        self.tracker.status()
    }

    pub fn pages_completed(&self) -> u64 {
        self.tracker.pages_completed()
    }

    fn frontier_slot(&self) -> MutexGuard<'_, Option<Arc<Frontier>>> {
        self.frontier.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts crawling from `seed`
    ///
    /// Returns once the workers are launched. Configuration and seed errors
    /// leave the controller `Idle`; calling this on a controller that is not
    /// `Idle` fails with `CrawlError::InvalidTransition`.
    pub async fn start(&self, seed: &str) -> Result<()> {
        validate(&self.config)?;
        let seed = normalize_url(seed)?;

        let mut pool_slot = self.pool.lock().await;
        self.tracker.begin()?;

        let frontier = Arc::new(Frontier::new(self.config.crawler.clone()));
        frontier.enqueue(seed.clone(), 0);
        *self.frontier_slot() = Some(frontier.clone());

        let robots = self.config.crawler.respect_robots_txt.then(|| {
            RobotsPolicy::new(
                self.fetcher.clone(),
                self.config.user_agent.crawler_name.clone(),
            )
        });
        let processor = PageProcessor::new(
            frontier.clone(),
            self.config.clone(),
            seed.clone(),
            self.events.clone(),
        );
        let ctx = WorkerContext::new(
            self.config.clone(),
            frontier,
            self.fetcher.clone(),
            processor,
            robots,
            self.tracker.clone(),
            self.events.clone(),
        );

        let workers = self.config.crawler.max_concurrent_workers as usize;
        tracing::info!("Starting crawl at {} with {} workers", seed, workers);
        *pool_slot = Some(WorkerPool::spawn(ctx, workers));

        Ok(())
    }

    /// Waits until every worker has exited and returns the summary
    ///
    /// Fails with `CrawlError::NotStarted` if the crawl was never started
    /// or stopped.
    pub async fn wait(&self) -> Result<CrawlSummary> {
        let mut pool_slot = self.pool.lock().await;
        if let Some(pool) = pool_slot.take() {
            let failed = pool.join().await;
            if failed > 0 {
                tracing::warn!("{} workers ended abnormally", failed);
            }
            self.tracker.complete();
            self.events.close();
        }

        match self.tracker.status() {
            CrawlStatus::Idle => Err(CrawlError::NotStarted),
            _ => Ok(self.summary()),
        }
    }

    /// Starts the crawl and waits for it to complete
    pub async fn run(&self, seed: &str) -> Result<CrawlSummary> {
        self.start(seed).await?;
        self.wait().await
    }

    /// Requests the crawl to stop
    ///
    /// In-flight fetches finish and publish their events; nothing new is
    /// dispatched. Stopping an idle controller completes it immediately.
    pub fn stop(&self) {
        match self.tracker.request_stop() {
            CrawlStatus::Idle => {
                tracing::info!("Crawl stopped before it started");
                self.events.close();
            }
            CrawlStatus::Running => {
                tracing::info!("Stop requested, draining workers");
                if let Some(frontier) = self.frontier_slot().as_ref() {
                    frontier.close();
                }
            }
            CrawlStatus::Stopping | CrawlStatus::Completed => {}
        }
    }

    /// Returns the current statistics
    pub fn summary(&self) -> CrawlSummary {
        let (state, elapsed) = self.tracker.snapshot();
        match self.frontier_slot().as_ref() {
            Some(frontier) => CrawlSummary::from_state(
                &state,
                frontier.seen_count() as u64,
                frontier.len() as u64,
                elapsed,
            ),
            None => CrawlSummary::from_state(&state, 0, 0, elapsed),
        }
    }
}

/// Runs a complete crawl from `seed` over HTTP
///
/// Blocks until the crawl is `Completed`.
///
/// # Example
///
/// ```no_run
/// use sumi_crawl::{run_crawl, CrawlConfiguration};
///
/// # async fn example() -> sumi_crawl::Result<()> {
/// let mut config = CrawlConfiguration::default();
/// config.crawler.max_pages_to_crawl = 10;
/// let summary = run_crawl("https://example.com/", config).await?;
/// println!("Crawled {} pages", summary.pages_completed);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(seed: &str, config: CrawlConfiguration) -> Result<CrawlSummary> {
    CrawlController::new(config)?.run(seed).await
}
