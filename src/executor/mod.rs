//! Request execution.
//!
//! [`RequestExecutor`] turns one [`RequestDescriptor`] into at most
//! `max_attempts` exchanges: it attaches the current credential, sends the
//! request, classifies the outcome and backs off between retryable failures.

mod descriptor;

pub use descriptor::{ApiResponse, ContentKind, RequestBody, RequestDescriptor, ResponseBody};

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::auth::CredentialStore;
use crate::errors::{ApiError, ApiResult, Classification, ErrorClassifier};
use crate::observability::{redact, MetricsCollector, NoopMetricsCollector};
use crate::resilience::{RetryDecision, RetryPolicy, RetryState};
use crate::transport::{HttpRequest, HttpTransport, MultipartRequest};

/// Executes logical requests with credentials, classification and retries.
pub struct RequestExecutor {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialStore>,
    retry_policy: RetryPolicy,
    metrics: Arc<dyn MetricsCollector>,
    default_headers: Vec<(String, String)>,
}

impl RequestExecutor {
    /// Creates a new executor.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<dyn CredentialStore>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            credentials,
            retry_policy,
            metrics: Arc::new(NoopMetricsCollector),
            default_headers: Vec::new(),
        }
    }

    /// Sets the metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Sets headers sent with every request.
    pub fn with_default_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.default_headers = headers;
        self
    }

    /// Returns the retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the credential store.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Executes a request.
    pub async fn execute(&self, request: &RequestDescriptor) -> ApiResult<ApiResponse> {
        self.execute_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Executes a request and deserializes its JSON body into `T`.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> ApiResult<T> {
        self.execute(request).await?.json()
    }

    /// Cancellable form of [`execute_json`](Self::execute_json).
    pub async fn execute_json_with_cancel<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> ApiResult<T> {
        self.execute_with_cancel(request, cancel).await?.json()
    }

    /// Executes a request until it succeeds, fails terminally, runs out of
    /// attempts or `cancel` fires.
    ///
    /// Cancellation aborts the in-flight exchange or the pending backoff
    /// and returns [`ApiError::Cancelled`].
    #[instrument(
        skip(self, request, cancel),
        fields(method = %request.method(), path = %request.path())
    )]
    pub async fn execute_with_cancel(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> ApiResult<ApiResponse> {
        let operation = request.operation();
        let started = Instant::now();
        let max_attempts = self.retry_policy.max_attempts();
        let mut state = RetryState::new();

        loop {
            if cancel.is_cancelled() {
                return Err(self.cancelled(&operation, started));
            }

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(self.cancelled(&operation, started)),
                outcome = self.send_once(request) => outcome,
            };

            let failure = match outcome {
                Ok(response) => {
                    debug!(
                        status = response.status,
                        attempts = state.attempt() + 1,
                        "Request succeeded"
                    );
                    self.metrics
                        .record_request(&operation, true, started.elapsed());
                    return Ok(response);
                }
                Err(failure) => failure,
            };

            match state.record_failure(&self.retry_policy, &failure) {
                RetryDecision::Retry(delay) => {
                    info!(
                        attempt = state.attempt(),
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %failure.error,
                        "Retrying after error"
                    );
                    self.metrics.record_retry(&operation);

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(self.cancelled(&operation, started)),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::Stop => {
                    warn!(
                        attempts = state.attempt(),
                        kind = %failure.error.kind(),
                        status = ?failure.error.status(),
                        error = %failure.error,
                        "Request failed"
                    );
                    if let Some(body) = failure.error.body() {
                        debug!(body = %redact(body), "Error response body");
                    }
                    self.metrics
                        .record_request(&operation, false, started.elapsed());
                    self.metrics.record_error(failure.error.kind());
                    return Err(failure.error);
                }
            }
        }
    }

    /// Performs exactly one exchange.
    async fn send_once(&self, request: &RequestDescriptor) -> Result<ApiResponse, Classification> {
        let headers = self.build_headers(request);

        let result = match request.body() {
            Some(RequestBody::Multipart(parts)) => {
                self.transport
                    .send_multipart(MultipartRequest {
                        path: request.path().to_string(),
                        headers,
                        parts: parts.clone(),
                        timeout: request.timeout(),
                    })
                    .await
            }
            body => {
                let body = match body {
                    Some(RequestBody::Json(value)) => Some(serde_json::to_vec(value).map_err(
                        |e| {
                            Classification::from(ApiError::decode(format!(
                                "Failed to encode request body: {}",
                                e
                            )))
                        },
                    )?),
                    Some(RequestBody::Bytes { data, .. }) => Some(data.clone()),
                    _ => None,
                };

                self.transport
                    .send(HttpRequest {
                        method: request.method(),
                        path: request.path().to_string(),
                        query: request.query().to_vec(),
                        headers,
                        body,
                        timeout: request.timeout(),
                    })
                    .await
            }
        };

        let response = result.map_err(|e| ErrorClassifier::classify_transport(&e))?;
        let body = ErrorClassifier::classify_response(&response, request.accepts())?;

        Ok(ApiResponse {
            status: response.status,
            headers: response.headers,
            body,
        })
    }

    /// Builds headers for one attempt, reading the credential fresh.
    fn build_headers(&self, request: &RequestDescriptor) -> HashMap<String, String> {
        let mut headers: HashMap<String, String> = self.default_headers.iter().cloned().collect();

        match request.body() {
            Some(RequestBody::Json(_)) => {
                headers.insert(
                    "Content-Type".to_string(),
                    mime::APPLICATION_JSON.to_string(),
                );
            }
            Some(RequestBody::Bytes { content_type, .. }) => {
                headers.insert("Content-Type".to_string(), content_type.clone());
            }
            Some(RequestBody::Multipart(_)) => {
                headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
            }
            None => {}
        }

        if request.accepts() == ContentKind::Json {
            headers.insert("Accept".to_string(), mime::APPLICATION_JSON.to_string());
        }

        self.credentials.get().apply_auth(&mut headers);
        headers
    }

    fn cancelled(&self, operation: &str, started: Instant) -> ApiError {
        info!("Request cancelled");
        self.metrics
            .record_request(operation, false, started.elapsed());
        self.metrics.record_error(ApiError::Cancelled.kind());
        ApiError::Cancelled
    }
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("retry_policy", &self.retry_policy)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, InMemoryCredentialStore};
    use crate::errors::ApiErrorKind;
    use crate::mocks::{MockResponse, MockTransport};
    use crate::observability::DefaultMetricsCollector;
    use crate::resilience::RetryConfig;
    use crate::transport::{HttpMethod, MultipartPart, TransportError};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn executor(
        transport: &Arc<MockTransport>,
        store: &Arc<InMemoryCredentialStore>,
        max_attempts: u32,
    ) -> RequestExecutor {
        RequestExecutor::new(
            Arc::clone(transport) as Arc<dyn HttpTransport>,
            Arc::clone(store) as Arc<dyn CredentialStore>,
            RetryPolicy::new(
                RetryConfig::new()
                    .max_attempts(max_attempts)
                    .base_delay(Duration::from_secs(1))
                    .max_delay(Duration::from_secs(8)),
            ),
        )
    }

    fn server_error() -> MockResponse {
        MockResponse::error(500, "boom")
    }

    #[tokio::test(start_paused = true)]
    async fn test_balance_success() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.queue_json(&serde_json::json!({"income":1000,"expense":400,"balance":600}));

        let response = executor(&transport, &store, 3)
            .execute(&RequestDescriptor::get("/balance"))
            .await
            .unwrap();

        assert_eq!(
            response.body,
            ResponseBody::Json(serde_json::json!({"income":1000,"expense":400,"balance":600}))
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_exhausts_three_attempts() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(server_error());

        let started = tokio::time::Instant::now();
        let error = executor(&transport, &store, 3)
            .execute(&RequestDescriptor::get("/balance"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ApiErrorKind::HttpServer);
        assert_eq!(error.status(), Some(500));
        assert_eq!(transport.request_count(), 3);
        // 1s after the first failure, 2s after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3050));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_gaps_between_attempts() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(server_error());

        let _ = executor(&transport, &store, 3)
            .execute(&RequestDescriptor::get("/balance"))
            .await;

        let times = transport.request_times();
        assert_eq!(times.len(), 3);
        let first_gap = times[1] - times[0];
        let second_gap = times[2] - times[1];
        assert!(first_gap >= Duration::from_secs(1) && first_gap < Duration::from_millis(1010));
        assert!(second_gap >= Duration::from_secs(2) && second_gap < Duration::from_millis(2010));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_makes_one_attempt() {
        for status in [400, 401, 403, 404, 422] {
            let transport = Arc::new(MockTransport::new());
            let store = Arc::new(InMemoryCredentialStore::new());
            transport.set_default(MockResponse::error(status, "nope"));

            let error = executor(&transport, &store, 3)
                .execute(&RequestDescriptor::get("/transactions"))
                .await
                .unwrap_err();

            assert!(!error.is_retryable());
            assert_eq!(transport.request_count(), 1, "status {}", status);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_failure_not_retried() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(MockResponse::raw(200, b"not json".to_vec()));

        let error = executor(&transport, &store, 3)
            .execute(&RequestDescriptor::get("/balance"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ApiErrorKind::Decode);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_then_success() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.queue_failure(TransportError::Connection {
            message: "connection refused".to_string(),
        });
        transport.queue_json(&serde_json::json!([]));

        let response = executor(&transport, &store, 3)
            .execute(&RequestDescriptor::get("/transactions"))
            .await
            .unwrap();

        assert_eq!(response.body, ResponseBody::Json(serde_json::json!([])));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_makes_one_attempt() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.queue_failure(TransportError::InvalidRequest {
            message: "invalid header value".to_string(),
        });
        transport.queue_json(&serde_json::json!([]));

        let error = executor(&transport, &store, 3)
            .execute(&RequestDescriptor::get("/transactions"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ApiErrorKind::Network);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bearer_header_only_when_present() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(MockResponse::json(&serde_json::json!({})));
        let executor = executor(&transport, &store, 1);

        executor
            .execute(&RequestDescriptor::get("/balance"))
            .await
            .unwrap();
        store.set(Credential::bearer("jwt-abc"));
        executor
            .execute(&RequestDescriptor::get("/balance"))
            .await
            .unwrap();

        let requests = transport.requests();
        assert!(!requests[0].headers.contains_key("Authorization"));
        assert_eq!(
            requests[1].headers.get("Authorization"),
            Some(&"Bearer jwt-abc".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_json_body_sets_content_type() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(MockResponse::json(&serde_json::json!({"message": "ok"})));

        let request = RequestDescriptor::post("/register")
            .with_json(&serde_json::json!({"username": "ana", "password": "pw"}))
            .unwrap();
        executor(&transport, &store, 1)
            .execute(&request)
            .await
            .unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.method, HttpMethod::Post);
        assert_eq!(
            recorded.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        let sent: serde_json::Value = serde_json::from_slice(&recorded.body.unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({"username": "ana", "password": "pw"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multipart_has_no_manual_content_type() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::with_credential(Credential::bearer(
            "jwt",
        )));
        transport.set_default(MockResponse::json(&serde_json::json!({"message": "ok"})));

        let request = RequestDescriptor::post("/upload").with_multipart(vec![
            MultipartPart::file("file", "statement.csv", "text/csv", b"a,b".to_vec()),
        ]);
        executor(&transport, &store, 1)
            .with_default_headers(vec![(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )])
            .execute(&request)
            .await
            .unwrap();

        let recorded = transport.last_request().unwrap();
        assert!(recorded.multipart);
        assert!(!recorded
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type")));
        assert_eq!(
            recorded.headers.get("Authorization"),
            Some(&"Bearer jwt".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_returns_promptly() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(server_error());
        let executor = Arc::new(
            RequestExecutor::new(
                Arc::clone(&transport) as Arc<dyn HttpTransport>,
                Arc::clone(&store) as Arc<dyn CredentialStore>,
                RetryPolicy::new(
                    RetryConfig::new()
                        .max_attempts(3)
                        .base_delay(Duration::from_secs(60))
                        .max_delay(Duration::from_secs(60)),
                ),
            ),
        );
        let cancel = CancellationToken::new();

        let task = {
            let executor = Arc::clone(&executor);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                executor
                    .execute_with_cancel(&RequestDescriptor::get("/balance"), &cancel)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let cancelled_at = tokio::time::Instant::now();
        cancel.cancel();
        let result = task.await.unwrap();

        assert_eq!(result.unwrap_err(), ApiError::Cancelled);
        assert_eq!(transport.request_count(), 1);
        assert!(cancelled_at.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_exchange() {
        let transport = Arc::new(MockTransport::new().with_latency(Duration::from_secs(30)));
        let store = Arc::new(InMemoryCredentialStore::new());
        transport.set_default(MockResponse::json(&serde_json::json!({})));
        let executor = executor(&transport, &store, 3);
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                cancel.cancel();
            }
        };

        let request = RequestDescriptor::get("/balance");
        let (result, ()) = tokio::join!(executor.execute_with_cancel(&request, &cancel), canceller);

        assert_eq!(result.unwrap_err(), ApiError::Cancelled);
        assert_eq!(transport.completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_sends_nothing() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = executor(&transport, &store, 3)
            .execute_with_cancel(&RequestDescriptor::get("/balance"), &cancel)
            .await;

        assert_eq!(result.unwrap_err(), ApiError::Cancelled);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_recorded() {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(InMemoryCredentialStore::new());
        let metrics = Arc::new(DefaultMetricsCollector::new());
        transport.queue(server_error());
        transport.queue_json(&serde_json::json!({}));
        transport.queue(MockResponse::error(401, "expired"));

        let executor = executor(&transport, &store, 3)
            .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsCollector>);
        executor
            .execute(&RequestDescriptor::get("/balance"))
            .await
            .unwrap();
        let _ = executor.execute(&RequestDescriptor::get("/balance")).await;

        let snapshot = metrics.get_metrics();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.successful_requests, 1);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.error_count(ApiErrorKind::Auth), 1);
    }
}
