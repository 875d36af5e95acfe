//! Shared helpers for the WireMock integration tests.

#![allow(dead_code)]

use std::time::Duration;

use fintrack_client::{FinTrackClient, RetryConfig};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts a fresh mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Retry settings fast enough for real-time tests.
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new()
        .max_attempts(max_attempts)
        .base_delay(Duration::from_millis(10))
        .max_delay(Duration::from_millis(40))
}

/// Builds a client pointed at the mock server.
pub fn client_for(server: &MockServer, retry: RetryConfig) -> FinTrackClient {
    FinTrackClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .retry(retry)
        .build()
        .expect("client should build")
}

/// Same as [`client_for`] with a token already stored.
pub fn signed_in_client_for(server: &MockServer, token: &str) -> FinTrackClient {
    FinTrackClient::builder()
        .base_url(server.uri())
        .retry(fast_retry(1))
        .token(token)
        .build()
        .expect("client should build")
}

/// A mock that only matches requests carrying `Bearer <token>`.
pub fn mock_with_auth(method_matcher: &str, path_matcher: &str, token: &str) -> wiremock::MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("Authorization", format!("Bearer {}", token).as_str()))
}

/// `{"error": message}` with the given status.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "error": message }))
}

/// 200 with a JSON body.
pub fn success_response(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}
