//! Integration tests for the fetch client
//!
//! These tests use wiremock to create mock HTTP servers and exercise the retry loop,
//! block classification and identity headers end-to-end.

use std::sync::Arc;
use stream_harvest::config::{FetchConfig, SiteProfile};
use stream_harvest::fetch::{BlockClassifier, FetchClient, FetchError, ResponseClassification};
use stream_harvest::state::RunCounters;
use url::Url;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fetch configuration with short delays for testing
fn test_fetch_config(max_attempts: u32) -> FetchConfig {
    FetchConfig {
        max_attempts,
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
        backoff_base_ms: 5,
        backoff_max_ms: 1000,
        min_body_bytes: 0,
        min_host_interval_ms: 0,
        protection_pause_ms: 0,
        ..Default::default()
    }
}

fn test_profile() -> SiteProfile {
    SiteProfile {
        name: "mock".to_string(),
        base_url: "https://tv.example.com/".to_string(),
        channel_selectors: vec![],
        uses_blocking_protection: false,
        needs_scripted_rendering: false,
    }
}

fn client(max_attempts: u32) -> (FetchClient, Arc<RunCounters>) {
    let counters = Arc::new(RunCounters::new());
    let client = FetchClient::new(&test_fetch_config(max_attempts), counters.clone())
        .expect("Failed to build fetch client");
    (client, counters)
}

fn page_url(server: &MockServer, page: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page)).expect("Failed to parse mock URL")
}

#[tokio::test]
async fn test_always_503_exhausts_with_increasing_backoff() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(4);
    let result = client
        .fetch(&page_url(&mock_server, "/busy"), &test_profile(), None)
        .await;

    let Err(FetchError::Exhausted { attempts, .. }) = result else {
        panic!("Expected Exhausted, got {:?}", result);
    };

    assert_eq!(attempts.len(), 4);
    assert_eq!(counters.request_count(), 4);
    assert_eq!(counters.blocked_count(), 4);

    assert!(attempts[0].backoff_before.is_none());
    let delays: Vec<_> = attempts
        .iter()
        .skip(1)
        .map(|a| a.backoff_before.expect("Retries record their backoff"))
        .collect();
    assert_eq!(delays.len(), 3);
    for pair in delays.windows(2) {
        assert!(pair[1] > pair[0], "Backoff must grow: {:?}", delays);
    }

    for (i, attempt) in attempts.iter().enumerate() {
        assert_eq!(attempt.index as usize, i + 1);
        assert!(attempt.outcome.is_blocked());
    }
}

#[tokio::test]
async fn test_captcha_page_is_blocked() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/challenge"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>Please complete the CAPTCHA to continue</body></html>"),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(2);
    let error = client
        .fetch(&page_url(&mock_server, "/challenge"), &test_profile(), None)
        .await
        .expect_err("A captcha page must not be returned as content");

    assert!(error.is_blocked());
    assert_eq!(error.attempt_count(), 2);
    assert!(matches!(
        error.last_cause(),
        Some(FetchError::Blocked { status: 200, .. })
    ));
    assert_eq!(counters.blocked_count(), 2);
}

#[tokio::test]
async fn test_recovers_after_transient_block() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>channel page</html>"))
        .mount(&mock_server)
        .await;

    let (client, counters) = client(5);
    let page = client
        .fetch(&page_url(&mock_server, "/flaky"), &test_profile(), None)
        .await
        .expect("Second attempt should succeed");

    assert_eq!(page.status, 200);
    assert_eq!(page.attempts, 2);
    assert!(page.body.contains("channel page"));
    assert_eq!(counters.request_count(), 2);
    assert_eq!(counters.blocked_count(), 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(5);
    let result = client
        .fetch(&page_url(&mock_server, "/gone"), &test_profile(), None)
        .await;

    assert!(matches!(result, Err(FetchError::NotFound { status: 404, .. })));
    assert_eq!(counters.request_count(), 1);
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/error"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(2);
    let error = client
        .fetch(&page_url(&mock_server, "/error"), &test_profile(), None)
        .await
        .expect_err("A 500 response is never content");

    assert!(!error.is_blocked());
    assert!(matches!(
        error.last_cause(),
        Some(FetchError::UnexpectedStatus { status: 500, .. })
    ));
    assert_eq!(counters.blocked_count(), 0);
}

#[tokio::test]
async fn test_identity_headers_and_site_referer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channel"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .and(header("referer", "https://tv.example.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client(1);
    let page = client
        .fetch(&page_url(&mock_server, "/channel"), &test_profile(), None)
        .await;

    assert!(page.is_ok(), "Request should carry identity headers: {:?}", page);
}

#[tokio::test]
async fn test_embedding_page_is_referer() {
    let mock_server = MockServer::start().await;
    let embedding = page_url(&mock_server, "/channel");

    Mock::given(method("GET"))
        .and(path("/embed"))
        .and(header("referer", embedding.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>player</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client(1);
    let page = client
        .fetch(
            &page_url(&mock_server, "/embed"),
            &test_profile(),
            Some(&embedding),
        )
        .await;

    assert!(page.is_ok(), "Frame fetch should send the embedding page: {:?}", page);
}

#[tokio::test]
async fn test_probe_sends_range_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/live/index.m3u8"))
        .and(header("range", "bytes=0-1023"))
        .respond_with(ResponseTemplate::new(206).set_body_string("#EXTM3U"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(1);
    let status = client
        .probe_range(&page_url(&mock_server, "/live/index.m3u8"))
        .await
        .expect("Probe should reach the mock server");

    assert_eq!(status, 206);
    assert_eq!(counters.request_count(), 1);
}

#[tokio::test]
async fn test_redirect_is_returned_not_followed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>moved here</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(3);
    let old = page_url(&mock_server, "/old");

    let page = client
        .fetch(&old, &test_profile(), None)
        .await
        .expect("A redirect is a completed fetch");
    assert!(page.is_redirect());
    assert_eq!(page.status, 301);
    assert_eq!(page.redirect, Some(page_url(&mock_server, "/new")));
    assert!(page.body.is_empty());
    assert_eq!(counters.request_count(), 1);

    let landed = client
        .fetch_following(&old, &test_profile(), None)
        .await
        .expect("Redirect chain should end on /new");
    assert_eq!(landed.url, page_url(&mock_server, "/new"));
    assert!(landed.body.contains("moved here"));
}

#[tokio::test]
async fn test_redirect_loop_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/pong"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pong"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/ping"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client(1);
    let result = client
        .fetch_following(&page_url(&mock_server, "/ping"), &test_profile(), None)
        .await;

    assert!(matches!(result, Err(FetchError::TooManyRedirects { .. })));
}

#[tokio::test]
async fn test_range_request_follows_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/go/espn.m3u8"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/live/espn/index.m3u8"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/live/espn/index.m3u8"))
        .and(header("range", "bytes=0-1023"))
        .respond_with(ResponseTemplate::new(206).set_body_string("#EXTM3U"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(1);
    let status = client
        .probe_range(&page_url(&mock_server, "/go/espn.m3u8"))
        .await
        .expect("Probe should reach the redirect target");

    assert_eq!(status, 206);
    assert_eq!(counters.request_count(), 2);
}

/// Treats maintenance pages as blocks and everything else with status 200 as content
struct MaintenanceClassifier;

impl BlockClassifier for MaintenanceClassifier {
    fn classify(&self, status: u16, body: &str) -> ResponseClassification {
        match status {
            200 if body.contains("maintenance") => ResponseClassification::Blocked,
            200 => ResponseClassification::Success,
            _ => ResponseClassification::TransientError,
        }
    }
}

#[tokio::test]
async fn test_custom_block_classifier() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/maintenance"))
        .respond_with(ResponseTemplate::new(200).set_body_string("down for maintenance"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/captcha-article"))
        .respond_with(ResponseTemplate::new(200).set_body_string("how a captcha works"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, counters) = client(1);
    let client = client.with_classifier(Box::new(MaintenanceClassifier));

    let blocked = client
        .fetch(&page_url(&mock_server, "/maintenance"), &test_profile(), None)
        .await;
    assert!(blocked.is_err_and(|e| e.is_blocked()));

    let page = client
        .fetch(&page_url(&mock_server, "/captcha-article"), &test_profile(), None)
        .await;
    assert!(page.is_ok());
    assert_eq!(counters.blocked_count(), 1);
}
