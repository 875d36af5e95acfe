//! Mock implementations for testing.
//!
//! Provides a scripted transport and response fixtures for exercising the
//! executor and services without a server.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MultipartPart, MultipartRequest,
    TransportError,
};

type Responder = Box<dyn Fn(&RecordedRequest) -> Option<MockOutcome> + Send + Sync>;

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Vec<u8>>,
    /// Whether the request went through `send_multipart`.
    pub multipart: bool,
    /// Multipart parts, if any.
    pub parts: Vec<MultipartPart>,
}

impl RecordedRequest {
    /// Parses the body as JSON.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

/// A mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockResponse {
    /// Creates a successful JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status: 200,
            headers,
            body,
        }
    }

    /// Creates an error response shaped like the API's `{"error": "..."}`.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(&serde_json::json!({ "error": message })).with_status(status)
    }

    /// Creates a response with an arbitrary body.
    pub fn raw(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Creates a response with custom status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

/// Outcome of one scripted exchange.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// A response was received.
    Response(MockResponse),
    /// The exchange failed before a response arrived.
    Failure(TransportError),
}

impl From<MockResponse> for MockOutcome {
    fn from(response: MockResponse) -> Self {
        MockOutcome::Response(response)
    }
}

/// Mock HTTP transport for testing.
///
/// Outcomes are picked in order from the queue, then the responder, then
/// per-path routes, then the default.
pub struct MockTransport {
    queue: Mutex<VecDeque<MockOutcome>>,
    responder: Option<Responder>,
    routes: Mutex<HashMap<String, MockOutcome>>,
    default_outcome: Mutex<Option<MockOutcome>>,
    requests: Mutex<Vec<RecordedRequest>>,
    request_times: Mutex<Vec<Instant>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            routes: Mutex::new(HashMap::new()),
            default_outcome: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            request_times: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Delays every exchange by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Computes outcomes from the request. Returning `None` falls through
    /// to routes and the default.
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Option<MockOutcome> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        self.queue.lock().push_back(MockOutcome::Response(response));
    }

    /// Queues a JSON response.
    pub fn queue_json<T: serde::Serialize>(&self, value: &T) {
        self.queue(MockResponse::json(value));
    }

    /// Queues an error response.
    pub fn queue_error(&self, status: u16, message: &str) {
        self.queue(MockResponse::error(status, message));
    }

    /// Queues a transport failure.
    pub fn queue_failure(&self, error: TransportError) {
        self.queue.lock().push_back(MockOutcome::Failure(error));
    }

    /// Answers every request to `path` with `outcome`.
    pub fn route(&self, path: &str, outcome: impl Into<MockOutcome>) {
        self.routes.lock().insert(path.to_string(), outcome.into());
    }

    /// Sets the default response.
    pub fn set_default(&self, response: MockResponse) {
        *self.default_outcome.lock() = Some(MockOutcome::Response(response));
    }

    /// Sets a transport failure as the default outcome.
    pub fn set_default_failure(&self, error: TransportError) {
        *self.default_outcome.lock() = Some(MockOutcome::Failure(error));
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Returns the number of exchanges started.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of requests made to `path`.
    pub fn request_count_for(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    /// Returns when each exchange started.
    pub fn request_times(&self) -> Vec<Instant> {
        self.request_times.lock().clone()
    }

    /// Returns the number of exchanges that ran to completion.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Returns the highest number of simultaneous exchanges seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_outcome(&self, request: &RecordedRequest) -> MockOutcome {
        if let Some(outcome) = self.queue.lock().pop_front() {
            return outcome;
        }
        if let Some(outcome) = self.responder.as_ref().and_then(|f| f(request)) {
            return outcome;
        }
        if let Some(outcome) = self.routes.lock().get(&request.path).cloned() {
            return outcome;
        }
        self.default_outcome
            .lock()
            .clone()
            .unwrap_or_else(|| MockResponse::error(500, "No mock response configured").into())
    }

    async fn exchange(&self, request: RecordedRequest) -> Result<HttpResponse, TransportError> {
        let outcome = self.next_outcome(&request);
        self.requests.lock().push(request);
        self.request_times.lock().push(Instant::now());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        match outcome {
            MockOutcome::Response(response) => Ok(HttpResponse {
                status: response.status,
                headers: response.headers,
                body: response.body,
            }),
            MockOutcome::Failure(error) => Err(error),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.exchange(RecordedRequest {
            method: request.method,
            path: request.path,
            query: request.query,
            headers: request.headers,
            body: request.body,
            multipart: false,
            parts: Vec::new(),
        })
        .await
    }

    async fn send_multipart(
        &self,
        request: MultipartRequest,
    ) -> Result<HttpResponse, TransportError> {
        self.exchange(RecordedRequest {
            method: HttpMethod::Post,
            path: request.path,
            query: Vec::new(),
            headers: request.headers,
            body: None,
            multipart: true,
            parts: request.parts,
        })
        .await
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("request_count", &self.request_count())
            .field("latency", &self.latency)
            .finish()
    }
}

/// Test fixtures shaped like real API payloads.
pub mod fixtures {
    use serde_json::{json, Value};

    /// `GET /balance` payload.
    pub fn balance() -> Value {
        json!({"income": 1000, "expense": 400, "balance": 600})
    }

    /// `GET /transactions` payload with one income and one expense.
    pub fn transactions() -> Value {
        json!([
            {
                "id": 1,
                "timestamp": "2024-03-01T09:30:00",
                "description": "Salary",
                "amount": 1000.0,
                "type": "income",
                "category": "Salary"
            },
            {
                "id": 2,
                "timestamp": "2024-03-02T18:05:00",
                "description": "Groceries",
                "amount": 400.0,
                "type": "expense",
                "category": "Food"
            }
        ])
    }

    /// `GET /monthly-summary` payload.
    pub fn monthly_summary(month: &str) -> Value {
        json!({"month": month, "summary": {"Food": 250.5, "Transport": 60.0}})
    }

    /// `POST /login` payload.
    pub fn login(token: &str) -> Value {
        json!({ "token": token })
    }
}
