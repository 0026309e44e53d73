//! HTTP fetch layer tests against mock servers

use driftnet::config::{Config, EngineConfig, SeedEntry, UserAgentConfig};
use driftnet::engine::{build_http_client, HttpFetchLayer};
use driftnet::protocol::{FetchOutcome, Request, Session};
use driftnet::{EngineError, FetchLayer};
use std::sync::atomic::Ordering;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn http_layer() -> HttpFetchLayer {
    let client = build_http_client(&user_agent(), Duration::from_secs(5)).unwrap();
    HttpFetchLayer::new(client, 4)
}

fn request_for(server_uri: &str, path: &str) -> Request {
    let session = Session::new("test");
    let url = Url::parse(&format!("{}{}", server_uri, path)).unwrap();
    Request::new(url, session.id())
}

#[tokio::test]
async fn test_fetch_success_returns_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let layer = http_layer();
    let outcome = layer.fetch(request_for(&server.uri(), "/page")).await.unwrap();

    match outcome {
        FetchOutcome::Page(response) => {
            assert_eq!(response.status, 200);
            assert_eq!(response.body, "hello");
        }
        other => panic!("expected a page, got {:?}", other),
    }
    assert_eq!(layer.active(), 0);
}

#[tokio::test]
async fn test_redirect_surfaces_as_follow_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
        .mount(&server)
        .await;

    let layer = http_layer();
    let original = request_for(&server.uri(), "/old");
    let session = original.session();
    let outcome = layer.fetch(original).await.unwrap();

    match outcome {
        FetchOutcome::FollowUp(next) => {
            assert_eq!(next.url.path(), "/new");
            assert_eq!(next.session(), session);
        }
        other => panic!("expected a follow-up, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let layer = http_layer();
    let result = layer.fetch(request_for(&server.uri(), "/broken")).await;

    match result {
        Err(EngineError::Fetch { message, .. }) => assert_eq!(message, "HTTP 500"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected a fetch error"),
    }
    assert_eq!(layer.active(), 0);
}

#[tokio::test]
async fn test_full_session_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seed1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("one"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/seed2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("two"))
        .mount(&server)
        .await;

    let config = Config {
        engine: EngineConfig {
            max_concurrent_fetches: 4,
            request_timeout_secs: 5,
            grace_delay_ms: 50,
            heartbeat_interval_ms: 50,
        },
        user_agent: user_agent(),
        seed: vec![
            SeedEntry {
                url: format!("{}/seed1", server.uri()),
                priority: 0,
            },
            SeedEntry {
                url: format!("{}/seed2", server.uri()),
                priority: 0,
            },
        ],
    };

    let stats = tokio::time::timeout(Duration::from_secs(10), driftnet::engine::run(config, true))
        .await
        .expect("session did not close")
        .unwrap();

    assert_eq!(stats.requests_dispatched.load(Ordering::SeqCst), 2);
    assert_eq!(stats.requests_succeeded.load(Ordering::SeqCst), 2);
}
