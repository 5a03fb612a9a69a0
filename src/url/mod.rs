//! URL handling module for Sumi-Crawl
//!
//! This module provides URL normalization (the frontier's dedupe key),
//! host extraction for politeness tracking, and the host-scope check used
//! when deciding whether a discovered link is followed.

mod domain;
mod normalize;

pub use domain::extract_domain;
pub use normalize::{normalize_parsed, normalize_url};

use url::Url;

/// Returns true if `candidate` is on the same host as `origin`
///
/// Hosts are compared case-insensitively; ports and schemes are ignored so
/// that an `http` → `https` hop on the same site is not treated as external.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_crawl::url::is_same_host;
///
/// let origin = Url::parse("https://example.com/a").unwrap();
/// assert!(is_same_host(&origin, &Url::parse("http://EXAMPLE.com/b").unwrap()));
/// assert!(!is_same_host(&origin, &Url::parse("https://other.com/").unwrap()));
/// ```
pub fn is_same_host(origin: &Url, candidate: &Url) -> bool {
    match (extract_domain(origin), extract_domain(candidate)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
