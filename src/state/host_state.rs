use crate::config::CrawlerConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks the politeness state of one host during crawling
///
/// The frontier keeps one of these per host and consults it on every
/// dequeue, so a host is never dispatched twice within its effective delay.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of fetches dispatched to this host in the current crawl
    pub request_count: u32,

    /// When the last fetch to this host was dispatched
    pub last_request_time: Option<Instant>,

    /// Crawl-delay advertised by the host's robots.txt
    pub crawl_delay: Option<Duration>,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the delay enforced between two dispatches to this host
    ///
    /// This is the larger of the configured politeness delay and the
    /// robots.txt crawl delay, if one is known.
    pub fn effective_delay(&self, config: &CrawlerConfig) -> Duration {
        let configured = config.politeness_delay();
        match self.crawl_delay {
            Some(robots_delay) => configured.max(robots_delay),
            None => configured,
        }
    }

    /// Records that a fetch was dispatched to this host
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Checks if this host has reached the per-host page limit
    pub fn has_exceeded_limit(&self, config: &CrawlerConfig) -> bool {
        config.max_pages_per_host > 0 && self.request_count >= config.max_pages_per_host
    }

    /// Records a request sent at `sent_at` ahead of an already dispatched fetch
    ///
    /// The dispatched fetch is pushed back to one effective delay after that
    /// request, and the pushed-back time becomes the host's last dispatch.
    /// Returns how long the fetch must wait from `now`. The page count is
    /// unchanged.
    pub fn defer_dispatch(
        &mut self,
        config: &CrawlerConfig,
        sent_at: Instant,
        now: Instant,
    ) -> Duration {
        let sent_at = match self.last_request_time {
            Some(last) => last.max(sent_at),
            None => sent_at,
        };
        let ready_at = sent_at + self.effective_delay(config);
        self.last_request_time = Some(ready_at.max(now));
        ready_at.saturating_duration_since(now)
    }

    /// Calculates the time until the next fetch may be dispatched
    ///
    /// Returns None if a fetch can be dispatched now.
    pub fn time_until_next_request(
        &self,
        config: &CrawlerConfig,
        now: Instant,
    ) -> Option<Duration> {
        // The last dispatch may lie in the future when a fetch was deferred
        let ready_at = self.last_request_time? + self.effective_delay(config);
        let wait = ready_at.saturating_duration_since(now);
        if wait.is_zero() {
            None
        } else {
            Some(wait)
        }
    }

    pub fn set_crawl_delay(&mut self, delay: Duration) {
        self.crawl_delay = Some(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> CrawlerConfig {
        CrawlerConfig {
            politeness_delay_millis: 1000,
            max_pages_per_host: 100,
            ..CrawlerConfig::default()
        }
    }

    #[test]
    fn test_new_host_state() {
        let state = HostState::new();
        assert_eq!(state.request_count, 0);
        assert!(state.last_request_time.is_none());
        assert!(state.crawl_delay.is_none());
    }

    #[test]
    fn test_limit_reached() {
        let mut state = HostState::new();
        state.request_count = 99;
        assert!(!state.has_exceeded_limit(&create_test_config()));
        state.request_count = 100;
        assert!(state.has_exceeded_limit(&create_test_config()));
    }

    #[test]
    fn test_unbounded_limit() {
        let mut state = HostState::new();
        state.request_count = 10_000;

        let config = CrawlerConfig {
            max_pages_per_host: 0,
            ..CrawlerConfig::default()
        };
        assert!(!state.has_exceeded_limit(&config));
    }

    #[test]
    fn test_zero_delay_allows_back_to_back() {
        let mut state = HostState::new();
        let now = Instant::now();
        state.record_request(now);

        let config = CrawlerConfig {
            politeness_delay_millis: 0,
            ..CrawlerConfig::default()
        };
        assert!(state.time_until_next_request(&config, now).is_none());
    }

    #[test]
    fn test_record_request() {
        let mut state = HostState::new();
        let now = Instant::now();

        state.record_request(now);
        assert_eq!(state.request_count, 1);
        assert_eq!(state.last_request_time, Some(now));

        state.record_request(now);
        assert_eq!(state.request_count, 2);
    }

    #[test]
    fn test_time_until_next_request() {
        let mut state = HostState::new();
        let config = create_test_config();
        let now = Instant::now();

        assert!(state.time_until_next_request(&config, now).is_none());

        state.last_request_time = Some(now);
        assert_eq!(
            state.time_until_next_request(&config, now),
            Some(Duration::from_millis(1000))
        );

        let soon = now + Duration::from_millis(400);
        assert_eq!(
            state.time_until_next_request(&config, soon),
            Some(Duration::from_millis(600))
        );

        let later = now + Duration::from_millis(1100);
        assert!(state.time_until_next_request(&config, later).is_none());
    }

    #[test]
    fn test_effective_delay_uses_larger_crawl_delay() {
        let mut state = HostState::new();
        let config = create_test_config();

        assert_eq!(state.effective_delay(&config), Duration::from_millis(1000));

        state.set_crawl_delay(Duration::from_secs(5));
        assert_eq!(state.effective_delay(&config), Duration::from_secs(5));

        state.set_crawl_delay(Duration::from_millis(200));
        assert_eq!(state.effective_delay(&config), Duration::from_millis(1000));
    }

    #[test]
    fn test_defer_dispatch_spaces_followup_fetch() {
        let mut state = HostState::new();
        let config = create_test_config();
        let dispatched = Instant::now();
        state.record_request(dispatched);

        let sent_at = dispatched + Duration::from_millis(10);
        let now = sent_at + Duration::from_millis(300);
        let wait = state.defer_dispatch(&config, sent_at, now);

        assert_eq!(wait, Duration::from_millis(700));
        assert_eq!(state.request_count, 1);
        assert_eq!(
            state.last_request_time,
            Some(sent_at + Duration::from_millis(1000))
        );

        // The next dispatch waits a full delay after the deferred fetch
        assert_eq!(
            state.time_until_next_request(&config, now),
            Some(Duration::from_millis(1700))
        );
    }

    #[test]
    fn test_defer_dispatch_after_delay_elapsed() {
        let mut state = HostState::new();
        let config = create_test_config();
        let sent_at = Instant::now();

        let now = sent_at + Duration::from_millis(1500);
        assert_eq!(state.defer_dispatch(&config, sent_at, now), Duration::ZERO);
        assert_eq!(state.last_request_time, Some(now));
    }
}
