//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock listing sites and test
//! the full crawl cycle end-to-end.

use roster_crawler::config::Config;
use roster_crawler::crawler::Coordinator;
use roster_crawler::output::{read_snapshot, JsonFileSink, OutputError, Snapshot, SnapshotSink};
use roster_crawler::state::StopReason;
use roster_crawler::CrawlOutcome;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointed at the mock server with no pacing
fn create_test_config(base_url: &str, output_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.site.referer = format!("{}/", base_url);
    config.fetch.timeout_secs = 5;
    config.fetch.retry_delay_ms = 10;
    config.fetch.pacing_min_ms = 0;
    config.fetch.pacing_max_ms = 0;
    config.fetch.rate_limit_default_wait_ms = 10;
    config.fetch.rate_limit_max_total_wait_ms = 1_000;
    config.pagination.max_pages = 10;
    config.output.path = output_dir
        .path()
        .join("roster.json")
        .display()
        .to_string();
    config
}

fn listing_path(page: u32) -> String {
    format!("/actor/list/1-0-{}.html", page)
}

/// Builds a listing page with `count` cards whose identifiers are hex tokens
fn listing_page(page: u32, count: usize) -> String {
    let cards: String = (0..count)
        .map(|i| {
            let id = format!("{:04x}-{:04x}", page, i);
            format!(
                r#"<div class="actor-card">
                     <a href="/Actor/Detail/{id}.html" title="Actor {page}-{i}">
                       <img src="/upload/actor/{id}/avatar.jpg" alt="Actor {page}-{i}">
                     </a>
                     <h3>Actor {page}-{i}</h3>
                   </div>"#,
                id = id,
                page = page,
                i = i
            )
        })
        .collect();

    format!(
        r#"<html><head><title>Actors - page {}</title></head><body><div class="list">{}</div></body></html>"#,
        page, cards
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, page: u32, count: usize, expected: u64) {
    Mock::given(method("GET"))
        .and(path(listing_path(page)))
        .respond_with(html(listing_page(page, count)))
        .expect(expected)
        .mount(server)
        .await;
}

async fn run(config: Config) -> CrawlOutcome {
    Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed")
}

#[tokio::test]
async fn test_short_page_stops_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 24, 1).await;
    mount_page(&server, 2, 24, 1).await;
    mount_page(&server, 3, 10, 1).await;
    mount_page(&server, 4, 24, 0).await;

    let outcome = run(create_test_config(&server.uri(), &dir)).await;

    assert_eq!(
        outcome.stop_reason,
        StopReason::ShortPage {
            page: 3,
            records: 10,
            threshold: 24
        }
    );
    assert_eq!(outcome.entities.len(), 58);
    assert_eq!(outcome.stats.pages_attempted, 3);
    assert_eq!(outcome.stats.pages_succeeded, 3);
    assert_eq!(outcome.stats.entities_found, 58);
    assert_eq!(
        outcome.entities.get("0003-0009").map(String::as_str),
        Some("Actor 3-9")
    );
}

#[tokio::test]
async fn test_page_without_usable_records_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let nameless: String = (0..24)
        .map(|i| {
            format!(
                r#"<div class="actor-card"><a href="/Actor/Detail/ffff-{:04x}.html" title="Unknown"></a></div>"#,
                i
            )
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(html(format!(
            r#"<html><body><div class="list">{}</div></body></html>"#,
            nameless
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 2, 24, 1).await;
    mount_page(&server, 3, 24, 1).await;
    mount_page(&server, 4, 5, 1).await;
    mount_page(&server, 5, 24, 0).await;

    let outcome = run(create_test_config(&server.uri(), &dir)).await;

    assert_eq!(
        outcome.stop_reason,
        StopReason::ShortPage {
            page: 4,
            records: 5,
            threshold: 24
        }
    );
    assert_eq!(outcome.stats.pages_attempted, 4);
    assert_eq!(outcome.stats.pages_empty, 1);
    assert_eq!(outcome.stats.pages_succeeded, 3);
    assert_eq!(outcome.stats.pages_failed, 0);
    assert_eq!(outcome.entities.len(), 53);
}

#[tokio::test]
async fn test_page_ceiling_stops_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, 1, 24, 1).await;
    mount_page(&server, 2, 24, 1).await;
    mount_page(&server, 3, 24, 0).await;

    let mut config = create_test_config(&server.uri(), &dir);
    config.pagination.max_pages = 2;
    let outcome = run(config).await;

    assert_eq!(
        outcome.stop_reason,
        StopReason::MaxPagesReached { max_pages: 2 }
    );
    assert_eq!(outcome.entities.len(), 48);
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // First request is rate limited, the retry succeeds
    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, 24, 1).await;
    mount_page(&server, 2, 5, 1).await;

    let outcome = run(create_test_config(&server.uri(), &dir)).await;

    assert_eq!(outcome.stats.rate_limit_waits, 1);
    assert_eq!(outcome.stats.retries, 0);
    assert_eq!(outcome.stats.pages_failed, 0);
    assert_eq!(outcome.entities.len(), 29);
}

#[tokio::test]
async fn test_rate_limit_budget_exhausted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Initial request plus two permitted waits
    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, 2, 3, 1).await;

    let mut config = create_test_config(&server.uri(), &dir);
    config.fetch.rate_limit_max_waits = 2;
    let outcome = run(config).await;

    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.stats.pages_succeeded, 1);
    assert_eq!(outcome.entities.len(), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_skips_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_page(&server, 2, 24, 1).await;
    mount_page(&server, 3, 2, 1).await;

    let outcome = run(create_test_config(&server.uri(), &dir)).await;

    assert_eq!(outcome.stats.pages_attempted, 3);
    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.entities.len(), 26);
    assert!(outcome.entities.keys().all(|id| !id.starts_with("0001-")));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 2, 7, 1).await;

    let outcome = run(create_test_config(&server.uri(), &dir)).await;

    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.entities.len(), 7);
}

#[tokio::test]
async fn test_incomplete_page_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // A challenge page without any record card
    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(html(
            "<html><body><p>Checking your browser...</p></body></html>".to_string(),
        ))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, 24, 1).await;
    mount_page(&server, 2, 1, 1).await;

    let outcome = run(create_test_config(&server.uri(), &dir)).await;

    assert_eq!(outcome.stats.retries, 1);
    assert_eq!(outcome.stats.pages_failed, 0);
    assert_eq!(outcome.entities.len(), 25);
}

#[tokio::test]
async fn test_browser_headers_are_sent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.fetch.user_agents = vec!["RosterTest/1.0".to_string()];

    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .and(header("user-agent", "RosterTest/1.0"))
        .and(header("referer", format!("{}/", server.uri()).as_str()))
        .and(header("dnt", "1"))
        .and(header("sec-fetch-mode", "navigate"))
        .respond_with(html(listing_page(1, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = run(config).await;
    assert_eq!(outcome.entities.len(), 3);
}

/// Serves a full page and cancels the run while doing so
struct CancellingResponder {
    token: CancellationToken,
    body: String,
}

impl Respond for CancellingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.token.cancel();
        html(self.body.clone())
    }
}

#[tokio::test]
async fn test_cancellation_keeps_partial_result() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let token = CancellationToken::new();

    mount_page(&server, 1, 24, 1).await;
    Mock::given(method("GET"))
        .and(path(listing_path(2)))
        .respond_with(CancellingResponder {
            token: token.clone(),
            body: listing_page(2, 24),
        })
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, 3, 24, 0).await;

    let outcome = Coordinator::new(create_test_config(&server.uri(), &dir))
        .unwrap()
        .with_cancellation(token)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled { before_page: 3 });
    assert_eq!(outcome.entities.len(), 48);
}

#[tokio::test]
async fn test_crawl_and_persist_non_ascii() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let page = r#"<html><body>
        <div class="actor-card">
          <a href="/Actor/Detail/5f2e-a9c1.html" title="三上悠亜"><img src="/upload/actor/5f2e-a9c1/a.jpg"></a>
        </div>
        <div class="actor-card">
          <a href="/Actor/Detail/77b0-0d3e.html"><img src="/upload/actor/77b0-0d3e/a.jpg" alt="河北彩花"></a>
        </div>
        <div class="actor-card">
          <a href="/Actor/Detail/0000-ffff.html" title="Unknown"></a>
        </div>
    </body></html>"#;
    Mock::given(method("GET"))
        .and(path(listing_path(1)))
        .respond_with(html(page.to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = run(config.clone()).await;
    assert_eq!(outcome.entities.len(), 2);

    let sink = JsonFileSink::new(&config.output.path);
    let snapshot = Snapshot::stamped(outcome.entities, config.output.utc_offset_hours).unwrap();
    sink.write(&snapshot).unwrap();

    let read_back = read_snapshot(sink.path()).unwrap();
    assert_eq!(read_back, snapshot);
    assert_eq!(read_back.total_count, 2);
    assert_eq!(read_back.entities["5f2e-a9c1"], "三上悠亜");
    assert_eq!(read_back.entities["77b0-0d3e"], "河北彩花");
}

#[tokio::test]
async fn test_failed_run_does_not_overwrite_snapshot() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.pagination.max_pages = 2;

    std::fs::write(&config.output.path, "previous snapshot").unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = run(config.clone()).await;
    assert_eq!(outcome.stats.pages_failed, 2);
    assert!(outcome.entities.is_empty());

    let sink = JsonFileSink::new(&config.output.path);
    let snapshot = Snapshot::stamped(outcome.entities, config.output.utc_offset_hours).unwrap();
    assert!(matches!(sink.write(&snapshot), Err(OutputError::Empty(_))));
    assert_eq!(
        std::fs::read_to_string(&config.output.path).unwrap(),
        "previous snapshot"
    );
}
