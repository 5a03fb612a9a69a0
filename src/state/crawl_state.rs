/// Crawl lifecycle and progress tracking
///
/// This module defines the controller's state machine and the per-crawl
/// counters that workers report into.
use crate::CrawlError;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use url::Url;

/// Lifecycle status of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    /// Controller constructed, crawl not started
    Idle,

    /// Workers are fetching
    Running,

    /// Frontier closed, in-flight workers are draining
    Stopping,

    /// All workers exited; terminal
    Completed,
}

impl CrawlStatus {
    /// Returns true if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// Legal transitions are `Idle -> Running -> Stopping -> Completed`,
    /// plus `Idle -> Completed` for a crawl stopped before it started.
    pub fn can_transition_to(&self, next: CrawlStatus) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Completed)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-crawl state owned by the controller
///
/// Workers report into this concurrently, so it always lives behind a lock.
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// URLs whose fetch was attempted
    pub visited: HashSet<Url>,

    /// Completion events recorded so far
    pub pages_completed: u64,

    /// Page slots reserved by workers before fetching
    pub pages_started: u64,

    /// Completions that carried a fetch error
    pub pages_failed: u64,

    /// HTTP status code counts across completions
    pub status_codes: BTreeMap<u16, u64>,

    pub status: CrawlStatus,
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            visited: HashSet::new(),
            pages_completed: 0,
            pages_started: 0,
            pages_failed: 0,
            status_codes: BTreeMap::new(),
            status: CrawlStatus::Idle,
        }
    }

    /// Moves the crawl to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: CrawlStatus) -> Result<(), CrawlError> {
        if !self.status.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::debug!("Crawl status {} -> {}", self.status, next);
        self.status = next;
        Ok(())
    }

    /// Reserves a page slot before a fetch starts
    ///
    /// Returns false when the crawl is no longer running or the page cap
    /// (`max_pages`, 0 = unbounded) has already been handed out.
    pub fn try_begin_page(&mut self, max_pages: u64) -> bool {
        if self.status != CrawlStatus::Running {
            return false;
        }
        if max_pages > 0 && self.pages_started >= max_pages {
            return false;
        }
        self.pages_started += 1;
        true
    }

    /// Records a completion event
    ///
    /// Returns true when this completion reaches the page cap.
    pub fn record_completion(
        &mut self,
        url: &Url,
        http_status: Option<u16>,
        failed: bool,
        max_pages: u64,
    ) -> bool {
        self.visited.insert(url.clone());
        self.pages_completed += 1;
        if failed {
            self.pages_failed += 1;
        }
        if let Some(code) = http_status {
            *self.status_codes.entry(code).or_insert(0) += 1;
        }
        max_pages > 0 && self.pages_completed >= max_pages
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.test{}", path)).unwrap()
    }

    #[test]
    fn test_legal_transitions() {
        assert!(CrawlStatus::Idle.can_transition_to(CrawlStatus::Running));
        assert!(CrawlStatus::Running.can_transition_to(CrawlStatus::Stopping));
        assert!(CrawlStatus::Stopping.can_transition_to(CrawlStatus::Completed));
        assert!(CrawlStatus::Idle.can_transition_to(CrawlStatus::Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!CrawlStatus::Completed.can_transition_to(CrawlStatus::Running));
        assert!(!CrawlStatus::Completed.can_transition_to(CrawlStatus::Idle));
        assert!(!CrawlStatus::Running.can_transition_to(CrawlStatus::Idle));
        assert!(!CrawlStatus::Running.can_transition_to(CrawlStatus::Completed));
        assert!(!CrawlStatus::Stopping.can_transition_to(CrawlStatus::Running));
    }

    #[test]
    fn test_transition_error_reports_states() {
        let mut state = CrawlState::new();
        state.status = CrawlStatus::Completed;

        let err = state.transition(CrawlStatus::Running).unwrap_err();
        match err {
            CrawlError::InvalidTransition { from, to } => {
                assert_eq!(from, CrawlStatus::Completed);
                assert_eq!(to, CrawlStatus::Running);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(state.status, CrawlStatus::Completed);
    }

    #[test]
    fn test_only_completed_is_terminal() {
        assert!(CrawlStatus::Completed.is_terminal());
        assert!(!CrawlStatus::Idle.is_terminal());
        assert!(!CrawlStatus::Running.is_terminal());
        assert!(!CrawlStatus::Stopping.is_terminal());
    }

    #[test]
    fn test_begin_page_requires_running() {
        let mut state = CrawlState::new();
        assert!(!state.try_begin_page(0));

        state.transition(CrawlStatus::Running).unwrap();
        assert!(state.try_begin_page(0));

        state.transition(CrawlStatus::Stopping).unwrap();
        assert!(!state.try_begin_page(0));
        assert_eq!(state.pages_started, 1);
    }

    #[test]
    fn test_begin_page_respects_cap() {
        let mut state = CrawlState::new();
        state.transition(CrawlStatus::Running).unwrap();

        assert!(state.try_begin_page(2));
        assert!(state.try_begin_page(2));
        assert!(!state.try_begin_page(2));
        assert_eq!(state.pages_started, 2);
    }

    #[test]
    fn test_record_completion_reports_cap() {
        let mut state = CrawlState::new();

        assert!(!state.record_completion(&url("/a"), Some(200), false, 2));
        assert!(state.record_completion(&url("/b"), Some(404), true, 2));

        assert_eq!(state.pages_completed, 2);
        assert_eq!(state.pages_failed, 1);
        assert_eq!(state.status_codes.get(&200), Some(&1));
        assert_eq!(state.status_codes.get(&404), Some(&1));
        assert!(state.visited.contains(&url("/a")));
    }

    #[test]
    fn test_record_completion_unbounded() {
        let mut state = CrawlState::new();
        for i in 0..50 {
            assert!(!state.record_completion(&url(&format!("/{i}")), None, true, 0));
        }
        assert_eq!(state.pages_completed, 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlStatus::Stopping), "stopping");
        assert_eq!(CrawlStatus::Idle.to_string(), "idle");
    }
}
