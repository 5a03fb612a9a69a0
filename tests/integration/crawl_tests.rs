//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end over real HTTP.

use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_crawl::crawler::FetchError;
use sumi_crawl::{run_crawl, CompletionStream, CrawlConfiguration, CrawlController, CrawlStatus};
use sumi_crawl::ProcessedPage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts
fn create_test_config(max_pages: u64, workers: u32) -> CrawlConfiguration {
    let mut config = CrawlConfiguration::default();
    config.crawler.max_pages_to_crawl = max_pages;
    config.crawler.max_concurrent_workers = workers;
    config.crawler.fetch_timeout_millis = 5_000;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn html(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body>{body}</body></html>")
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

async fn collect(mut stream: CompletionStream) -> Vec<Arc<ProcessedPage>> {
    let mut pages = Vec::new();
    while let Some(page) = stream.recv().await {
        pages.push(page);
    }
    pages
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/",
        html(
            "Home",
            &format!(r#"<a href="{base_url}/page1">Page 1</a> <a href="/page2">Page 2</a>"#),
        ),
    )
    .await;
    mount_html(&server, "/page1", html("Page 1", "Content 1")).await;
    mount_html(&server, "/page2", html("Page 2", "Content 2 <a href=\"/\">home</a>")).await;

    let controller = CrawlController::new(create_test_config(0, 3)).expect("controller");
    let events = controller.subscribe();

    let summary = controller
        .run(&format!("{base_url}/"))
        .await
        .expect("crawl failed");
    let pages = collect(events).await;

    assert_eq!(summary.status, CrawlStatus::Completed);
    assert_eq!(summary.pages_completed, 3);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(summary.status_codes.get(&200), Some(&3));
    assert_eq!(pages.len(), 3);

    let page1 = pages
        .iter()
        .find(|p| p.url.path() == "/page1")
        .expect("page1 event");
    assert_eq!(page1.title.as_deref(), Some("Page 1"));
    assert_eq!(page1.content_text, "Content 1");
    assert_eq!(page1.depth, 1);

    let home = pages.iter().find(|p| p.url.path() == "/").expect("home event");
    assert_eq!(home.links_enqueued, 2);
}

#[tokio::test]
async fn test_single_page_with_render_wait() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/a",
        html("Dogs", r#"<p>All about dogs</p><a href="/b">next</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("B", "b"), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(1, 1);
    config.rendering.javascript_rendering_enabled = true;
    config.rendering.render_wait_millis = 200;

    let controller = CrawlController::new(config).expect("controller");
    let events = controller.subscribe();
    let summary = controller.run(&format!("{base_url}/a")).await.unwrap();
    let pages = collect(events).await;

    assert_eq!(pages.len(), 1);
    assert!(pages[0].text_contains("dogs"));
    assert!(pages[0].elapsed_millis >= 200);
    assert_eq!(summary.pages_completed, 1);
    assert_eq!(summary.urls_discovered, 2);
    assert_eq!(summary.frontier_remaining, 1);
}

#[tokio::test]
async fn test_render_wait_longer_than_fetch_timeout() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/", html("Settled", "<p>rendered content</p>")).await;

    let mut config = create_test_config(1, 1);
    config.crawler.fetch_timeout_millis = 500;
    config.rendering.javascript_rendering_enabled = true;
    config.rendering.render_wait_millis = 700;

    let controller = CrawlController::new(config).expect("controller");
    let events = controller.subscribe();
    let summary = controller.run(&format!("{base_url}/")).await.unwrap();
    let pages = collect(events).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].error, None);
    assert_eq!(pages[0].http_status, Some(200));
    assert!(pages[0].text_contains("rendered content"));
    assert!(pages[0].elapsed_millis >= 700);
    assert_eq!(summary.pages_failed, 0);
}

#[tokio::test]
async fn test_not_found_page_reports_error() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/", html("Home", r#"<a href="/missing">gone</a>"#)).await;

    let controller = CrawlController::new(create_test_config(0, 2)).unwrap();
    let events = controller.subscribe();
    let summary = controller.run(&format!("{base_url}/")).await.unwrap();
    let pages = collect(events).await;

    let missing = pages
        .iter()
        .find(|p| p.url.path() == "/missing")
        .expect("event for missing page");
    assert_eq!(missing.error, Some(FetchError::Status { status: 404 }));
    assert_eq!(missing.http_status, Some(404));
    assert!(missing.discovered_links.is_empty());
    assert_eq!(summary.pages_failed, 1);
}

#[tokio::test]
async fn test_robots_txt_disallow_respected() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("User-agent: *\nDisallow: /private", "text/plain"),
        )
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/",
        html("Home", r#"<a href="/private">p</a><a href="/open">o</a>"#),
    )
    .await;
    mount_html(&server, "/open", html("Open", "open")).await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("P", "p"), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(0, 2);
    config.crawler.respect_robots_txt = true;

    let summary = run_crawl(&format!("{base_url}/"), config).await.unwrap();
    assert_eq!(summary.pages_completed, 2);
}

#[tokio::test]
async fn test_missing_robots_txt_allows_crawl() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/", html("Home", r#"<a href="/next">n</a>"#)).await;
    mount_html(&server, "/next", html("Next", "next")).await;

    let mut config = create_test_config(0, 1);
    config.crawler.respect_robots_txt = true;

    let summary = run_crawl(&format!("{base_url}/"), config).await.unwrap();
    assert_eq!(summary.pages_completed, 2);
    assert_eq!(summary.pages_failed, 0);
}

#[tokio::test]
async fn test_politeness_delay_spaces_requests() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/",
        html("Home", r#"<a href="/1">1</a><a href="/2">2</a>"#),
    )
    .await;
    mount_html(&server, "/1", html("1", "one")).await;
    mount_html(&server, "/2", html("2", "two")).await;

    let mut config = create_test_config(0, 3);
    config.crawler.politeness_delay_millis = 200;

    let started = Instant::now();
    let summary = run_crawl(&format!("{base_url}/"), config).await.unwrap();

    assert_eq!(summary.pages_completed, 3);
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_plain_text_page_has_no_links() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("see /other for more", "text/plain"),
        )
        .mount(&server)
        .await;

    let controller = CrawlController::new(create_test_config(0, 1)).unwrap();
    let events = controller.subscribe();
    controller
        .run(&format!("{base_url}/notes.txt"))
        .await
        .unwrap();
    let pages = collect(events).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].content_text, "see /other for more");
    assert!(pages[0].discovered_links.is_empty());
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html("Slow", "slow"), "text/html")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(0, 1);
    config.crawler.fetch_timeout_millis = 200;

    let controller = CrawlController::new(config).unwrap();
    let events = controller.subscribe();
    let summary = controller.run(&format!("{base_url}/slow")).await.unwrap();
    let pages = collect(events).await;

    assert_eq!(pages.len(), 1);
    assert!(matches!(pages[0].error, Some(FetchError::Timeout { .. })));
    assert_eq!(summary.status, CrawlStatus::Completed);
}
