mod common;

use std::time::{Duration, Instant};

use policy_checker::fetch::{build_client, ContentFetcher};
use policy_checker::Settings;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{html_page, mount_page};

fn fetcher(max_retries: u32) -> ContentFetcher {
    let client = build_client(&Settings::default()).unwrap();
    ContentFetcher::new(client, max_retries, Duration::from_millis(1))
}

#[tokio::test]
async fn extracts_main_text() {
    let server = MockServer::start().await;
    mount_page(&server, "/privacy", &html_page("<p>We store your Social Security Number.</p>")).await;

    let text = fetcher(3).fetch_text(&format!("{}/privacy", server.uri())).await;
    assert_eq!(text, "We store your Social Security Number.");
}

#[tokio::test]
async fn retries_server_errors_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/privacy"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/privacy", &html_page("<p>Recovered</p>")).await;

    let text = fetcher(3).fetch_text(&format!("{}/privacy", server.uri())).await;
    assert_eq!(text, "Recovered");
}

#[tokio::test]
async fn waits_longer_after_each_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let base = Duration::from_millis(100);
    let client = build_client(&Settings::default()).unwrap();
    let fetcher = ContentFetcher::new(client, 3, base);

    let started = Instant::now();
    assert!(fetcher.fetch_text(&format!("{}/privacy", server.uri())).await.is_empty());
    // 100 ms after the first failure, 200 ms after the second, none after the last
    assert!(started.elapsed() >= base * 3, "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let text = fetcher(3).fetch_text(&format!("{}/privacy", server.uri())).await;
    assert!(text.is_empty());
    // expectation verified on drop
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let text = fetcher(3).fetch_text(&format!("{}/privacy", server.uri())).await;
    assert!(text.is_empty());
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    assert!(fetcher(2).fetch_text(&format!("{}/p", server.uri())).await.is_empty());
}

#[tokio::test]
async fn page_without_text_is_empty() {
    let server = MockServer::start().await;
    mount_page(&server, "/blank", "<html><body><script>track()</script></body></html>").await;

    assert!(fetcher(3).fetch_text(&format!("{}/blank", server.uri())).await.is_empty());
}

#[tokio::test]
async fn connection_refused_returns_empty() {
    // nothing listens on the discard port
    let text = fetcher(2).fetch_text("http://127.0.0.1:9/privacy").await;
    assert!(text.is_empty());
}

#[tokio::test]
async fn malformed_url_returns_empty() {
    assert!(fetcher(3).fetch_text("not a url").await.is_empty());
}
