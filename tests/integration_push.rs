#![allow(clippy::unwrap_used, clippy::panic, missing_debug_implementations, unreachable_pub)]
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::{PUSH_URL_PATH, StubProvider, StubReply, TestApp, push_body};
use reqwest::StatusCode;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn test_push_success() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.push(push_body("aGk=", false)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.bytes().await.unwrap().is_empty());
    assert_eq!(app.provider.calls(), 1);

    let sent = app.provider.sent();
    assert_eq!(sent[0].token, "abc");
    assert_eq!(sent[0].payload(), Some("aGk="));
    assert_eq!(sent[0].android.priority.as_str(), "normal");
    assert_eq!(sent[0].android.restricted_package_name.as_deref(), Some("app.gomuks.android"));
}

#[tokio::test]
async fn test_high_priority_is_forwarded() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.push(push_body("aGk=", true)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.provider.sent()[0].android.priority.as_str(), "high");
}

#[tokio::test]
async fn test_oversized_request_rejected_before_provider() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.push(push_body(&"A".repeat(5000), false)).await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn test_oversized_payload_in_small_request_rejected() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    // 3001 raw bytes encode to 4004 characters, yet the whole body stays under 4096 bytes.
    let body = push_body(&STANDARD.encode(vec![1u8; 3001]), false);
    assert!(body.len() <= 4096);

    let resp = app.push(body).await;

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn test_largest_payload_accepted() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.push(push_body(&STANDARD.encode(vec![1u8; 3000]), false)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(app.provider.calls(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.push(r#"{"token":"abc","owner":"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.push(r#"{"token":"abc","payload":"%%%"}"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.push(r#"{"token":["abc"],"payload":"aGk="}"#).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn test_unregistered_token_is_not_found() {
    let app = TestApp::spawn(StubProvider::new(StubReply::Failure("Requested entity was not found."))).await;

    let resp = app.push(push_body("aGk=", false)).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.provider.calls(), 1);
}

#[tokio::test]
async fn test_sender_id_mismatch_is_not_found() {
    let app = TestApp::spawn(StubProvider::new(StubReply::Failure("SenderId mismatch"))).await;

    let resp = app.push(push_body("aGk=", false)).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_provider_failure_is_internal_error() {
    let app = TestApp::spawn(StubProvider::new(StubReply::Failure("operation timed out"))).await;

    let resp = app.push(push_body("aGk=", false)).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_identical_requests_get_identical_status() {
    let app = TestApp::spawn(StubProvider::new(StubReply::Failure("Requested entity was not found."))).await;

    let first = app.push(push_body("aGk=", false)).await.status();
    let second = app.push(push_body("aGk=", false)).await.status();

    assert_eq!(first, StatusCode::NOT_FOUND);
    assert_eq!(first, second);
    assert_eq!(app.provider.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let requests = (0..16).map(|_| app.push(push_body("aGk=", false)));
    let responses = futures::future::join_all(requests).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));
    assert_eq!(app.provider.calls(), 16);
}

#[tokio::test]
async fn test_unknown_routes_are_not_found() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.client.get(format!("{}/unknown", app.base_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.client.get(app.push_url()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.client.put(app.push_url()).body(push_body("aGk=", false)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.client.post(format!("{}/", app.base_url)).body(push_body("aGk=", false)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp =
        app.client.post(format!("{}/_gomuks/push/apns", app.base_url)).body(push_body("aGk=", false)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    assert_eq!(app.provider.calls(), 0);
}

#[tokio::test]
async fn test_index_page() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app.client.get(format!("{}/", app.base_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert!(resp.text().await.unwrap().contains("gomuks push gateway"));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = TestApp::spawn(StubProvider::new(StubReply::MessageId("msg-1"))).await;

    let resp = app
        .client
        .post(app.push_url())
        .header("x-request-id", "req-123")
        .body(push_body("aGk=", false))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "req-123");

    let resp = app.client.post(app.push_url()).body(push_body("aGk=", false)).send().await.unwrap();
    let generated = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_client_disconnect_cancels_provider_call() {
    let provider = StubProvider::with_delay(StubReply::MessageId("msg-1"), Duration::from_secs(3600));
    let app = TestApp::spawn(provider).await;

    let body = push_body("aGk=", false);
    let request = format!(
        "POST {PUSH_URL_PATH} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let mut stream = TcpStream::connect(app.server.local_addr()).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    app.provider.wait_for_calls(1).await;
    assert_eq!(app.provider.abandoned(), 0);
    drop(stream);

    app.provider.wait_for_abandoned(1).await;
    assert_eq!(app.provider.calls(), 1);
}
