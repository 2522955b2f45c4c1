//! Integration tests for common Courier workflows.
//!
//! These tests go through the facade the way an application would.

use courier::prelude::*;
use serde::Deserialize;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct WhatTypeOfMusicDoYouLove {
    answer: String,
}

// =============================================================================
// Request Target Tests
// =============================================================================

#[test]
fn test_relative_uri_composes_with_base_address() {
    let client = Client::new(ClientConfig::default()).unwrap();
    client
        .set_default(|s| s.base_address = Some("https://example.test".into()))
        .unwrap();

    let builder = client.with_uri("a/b").unwrap();
    let request = courier::wire::build(
        courier::Method::GET,
        &builder.effective_settings(),
        courier::wire::Body::Empty,
    )
    .unwrap();
    assert_eq!(request.target, "https://example.test/a/b");
}

#[test]
fn test_absolute_uri_without_base_address_is_unchanged() {
    let client = Client::new(ClientConfig::default()).unwrap();

    let builder = client.with_uri("https://example.test/x").unwrap();
    let request = courier::wire::build(
        courier::Method::GET,
        &builder.effective_settings(),
        courier::wire::Body::Empty,
    )
    .unwrap();
    assert_eq!(request.target, "https://example.test/x");
}

// =============================================================================
// Process-wide Client Tests
// =============================================================================

#[tokio::test]
async fn test_shared_instance_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/s/music.json"))
        .and(header("Authorization", "Bearer shared"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"answer": "Trance Music"})),
        )
        .mount(&server)
        .await;

    let client = Client::init(ClientConfig::builder().timeout(Duration::from_secs(10)).build())
        .unwrap();
    client
        .set_default(|s| {
            s.base_address = Some(server.uri());
            s.auth = Some(Auth::bearer("shared"));
        })
        .unwrap();

    let response = Client::instance()
        .unwrap()
        .with_uri("s/music.json")
        .unwrap()
        .get_as::<WhatTypeOfMusicDoYouLove>()
        .await
        .unwrap();

    assert!(response.is_successful());
    assert_eq!(response.body().unwrap().answer, "Trance Music");

    // a failed dispatch leaves the next chain clean as well
    let failed = client
        .with_uri("http://127.0.0.1:1/")
        .unwrap()
        .with_header("X-Leak", "1")
        .unwrap()
        .get()
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let next = client.with_uri("s/music.json").unwrap().effective_settings();
    assert!(!next.has_headers());
    assert_eq!(next.auth, Some(Auth::bearer("shared")));
}

#[test]
fn test_configuration_errors_fail_fast() {
    let client = Client::new(ClientConfig::default()).unwrap();

    assert!(matches!(
        client.with_uri(""),
        Err(ClientError::InvalidArgument { param: "uri" })
    ));
    assert!(matches!(
        client.with_cookies(Vec::<Cookie>::new()),
        Err(ClientError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        client.with_cookies(None::<Vec<Cookie>>),
        Err(ClientError::InvalidArgument { param: "cookies" })
    ));
    assert!(matches!(
        client.set_default(|s| s.base_address = Some("/relative".into())),
        Err(ClientError::InvalidConfiguration(_))
    ));
}
