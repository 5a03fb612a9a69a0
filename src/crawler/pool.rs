//! Fetch worker pool
//!
//! A fixed number of tokio tasks pull entries from the frontier, fetch them
//! and hand the results to the page processor. A worker exits when the
//! frontier closes; the last one out completes the crawl.

use crate::config::CrawlConfiguration;
use crate::crawler::controller::CrawlTracker;
use crate::crawler::events::EventBus;
use crate::crawler::fetcher::{FetchError, FetchRequest, Fetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::processor::{CrawlResult, PageProcessor};
use crate::robots::RobotsPolicy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Everything a worker needs, shared by all workers of one crawl
pub(crate) struct WorkerContext {
    config: Arc<CrawlConfiguration>,
    frontier: Arc<Frontier>,
    fetcher: Arc<dyn Fetcher>,
    processor: PageProcessor,
    robots: Option<RobotsPolicy>,
    tracker: Arc<CrawlTracker>,
    events: Arc<EventBus>,
    live_workers: AtomicUsize,
}

impl WorkerContext {
    pub(crate) fn new(
        config: Arc<CrawlConfiguration>,
        frontier: Arc<Frontier>,
        fetcher: Arc<dyn Fetcher>,
        processor: PageProcessor,
        robots: Option<RobotsPolicy>,
        tracker: Arc<CrawlTracker>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            frontier,
            fetcher,
            processor,
            robots,
            tracker,
            events,
            live_workers: AtomicUsize::new(0),
        }
    }

    /// Overall deadline for one fetch, render wait included
    fn fetch_deadline(&self) -> Duration {
        self.config.crawler.fetch_timeout()
            + self.config.rendering.render_wait().unwrap_or_default()
    }

    /// Handles one dequeued entry; the caller finishes it afterwards
    async fn handle(&self, entry: FrontierEntry) {
        if let Some(robots) = &self.robots {
            let verdict = robots.check(&entry.url).await;
            if let Some(delay) = verdict.crawl_delay {
                self.frontier.set_crawl_delay(&entry.host, delay);
            }
            if !verdict.allowed {
                tracing::info!("URL {} disallowed by robots.txt", entry.url);
                return;
            }
            if let Some(sent_at) = verdict.requested_at {
                // robots.txt used this entry's dispatch to the host
                let wait = self.frontier.defer_dispatch(&entry.host, sent_at);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            }
        }

        if !self.tracker.try_begin_page() {
            tracing::debug!("No page slot for {}, closing frontier", entry.url);
            self.frontier.close();
            return;
        }

        let request = FetchRequest {
            url: entry.url.clone(),
            render_javascript: self.config.rendering.javascript_rendering_enabled,
            render_wait: self.config.rendering.render_wait(),
        };
        let deadline = self.fetch_deadline();

        tracing::debug!("Fetching {} (depth {})", entry.url, entry.depth);
        let started = Instant::now();
        let outcome = tokio::time::timeout(deadline, self.fetcher.fetch(&request)).await;
        let elapsed_millis = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(page)) => CrawlResult {
                url: entry.url.clone(),
                depth: entry.depth,
                final_url: Some(page.final_url),
                http_status: Some(page.status_code),
                content_type: page.content_type,
                body: page.body,
                elapsed_millis,
                error: None,
            },
            Ok(Err(e)) => CrawlResult::failed(&entry, e, elapsed_millis),
            Err(_) => CrawlResult::failed(
                &entry,
                FetchError::Timeout {
                    millis: deadline.as_millis() as u64,
                },
                elapsed_millis,
            ),
        };

        let page = self.processor.process(result);
        if self.tracker.record_completion(&page) {
            self.frontier.close();
        }
    }
}

/// Decrements the live worker count when a worker ends, even by panic
struct WorkerExit<'a> {
    ctx: &'a WorkerContext,
    id: usize,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        tracing::debug!("Worker {} exiting", self.id);
        if std::thread::panicking() {
            // The entry this worker held will never be finished
            self.ctx.frontier.close();
        }
        if self.ctx.live_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.ctx.frontier.close();
            self.ctx.tracker.complete();
            self.ctx.events.close();
        }
    }
}

async fn run_worker(id: usize, ctx: Arc<WorkerContext>) {
    let _exit = WorkerExit { ctx: &ctx, id };
    tracing::debug!("Worker {} started", id);

    while let Some(entry) = ctx.frontier.dequeue().await {
        ctx.handle(entry).await;
        ctx.frontier.finish();
    }
}

/// Handle to the running workers of one crawl
pub struct WorkerPool {
    tasks: JoinSet<()>,
}

impl WorkerPool {
    /// Spawns exactly `size` workers onto the current runtime
    pub(crate) fn spawn(ctx: WorkerContext, size: usize) -> Self {
        ctx.live_workers.store(size, Ordering::Release);
        let ctx = Arc::new(ctx);

        let mut tasks = JoinSet::new();
        for id in 0..size {
            tasks.spawn(run_worker(id, ctx.clone()));
        }

        Self { tasks }
    }

    /// Waits for every worker to exit
    ///
    /// Returns the number of workers that ended abnormally.
    pub async fn join(mut self) -> usize {
        let mut failed = 0;
        while let Some(result) = self.tasks.join_next().await {
            if let Err(e) = result {
                failed += 1;
                if e.is_panic() {
                    tracing::error!("Worker panicked: {}", e);
                } else {
                    tracing::warn!("Worker cancelled: {}", e);
                }
            }
        }
        failed
    }
}
