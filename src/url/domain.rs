use url::Url;

/// Extracts the host key used for politeness tracking
///
/// The host is lowercased and the port is ignored, so every port on a host
/// shares one politeness budget.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_crawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
