//! Request metrics.
//!
//! The executor reports one outcome per logical request (not per attempt),
//! one event per retry and the kind of every terminal error.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::errors::ApiErrorKind;

const KINDS: [ApiErrorKind; 6] = [
    ApiErrorKind::Network,
    ApiErrorKind::HttpClient,
    ApiErrorKind::HttpServer,
    ApiErrorKind::Decode,
    ApiErrorKind::Auth,
    ApiErrorKind::Cancelled,
];

/// Sink for request outcomes.
pub trait MetricsCollector: Send + Sync {
    /// Records the terminal outcome of a logical request.
    fn record_request(&self, operation: &str, success: bool, duration: Duration);

    /// Records a retry of `operation`.
    fn record_retry(&self, operation: &str);

    /// Records a terminal error.
    fn record_error(&self, kind: ApiErrorKind);

    /// Takes a snapshot.
    fn get_metrics(&self) -> RequestMetrics;

    /// Resets all counters.
    fn reset(&self);
}

/// Counters for one operation, e.g. `GET /balance`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationStats {
    /// Logical requests.
    pub requests: u64,
    /// Requests that ended in an error.
    pub failures: u64,
    /// Retries.
    pub retries: u64,
    /// Summed latency, retries and backoff included.
    pub total_latency_ms: u64,
}

impl OperationStats {
    /// Mean latency per request.
    pub fn average_latency_ms(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.total_latency_ms as f64 / self.requests as f64
    }
}

/// Snapshot of everything a collector has seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMetrics {
    /// Logical requests.
    pub total_requests: u64,
    /// Requests that succeeded.
    pub successful_requests: u64,
    /// Requests that failed, cancellations included.
    pub failed_requests: u64,
    /// Retries across all operations.
    pub retries: u64,
    /// Summed latency in milliseconds.
    pub total_latency_ms: u64,
    /// Per-operation counters, sorted by operation.
    pub operations: BTreeMap<String, OperationStats>,
    /// Terminal errors by kind; kinds never seen are absent.
    pub errors: HashMap<ApiErrorKind, u64>,
}

impl RequestMetrics {
    /// Mean latency per request.
    pub fn average_latency_ms(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.total_latency_ms as f64 / self.total_requests as f64
    }

    /// Share of successful requests, in percent. 100 when nothing ran.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 100.0;
        }
        self.successful_requests as f64 * 100.0 / self.total_requests as f64
    }

    /// Number of terminal errors of `kind`.
    pub fn error_count(&self, kind: ApiErrorKind) -> u64 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }
}

/// In-process collector: lock-free totals, one mutex for the per-operation
/// table.
#[derive(Default)]
pub struct DefaultMetricsCollector {
    successful: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    latency_ms: AtomicU64,
    errors: [AtomicU64; 6],
    operations: Mutex<BTreeMap<String, OperationStats>>,
}

impl DefaultMetricsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(kind: ApiErrorKind) -> usize {
        KINDS.iter().position(|k| *k == kind).unwrap_or(0)
    }
}

impl MetricsCollector for DefaultMetricsCollector {
    fn record_request(&self, operation: &str, success: bool, duration: Duration) {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let counter = if success { &self.successful } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
        self.latency_ms.fetch_add(millis, Ordering::Relaxed);

        let mut operations = self.operations.lock();
        let stats = operations.entry(operation.to_string()).or_default();
        stats.requests += 1;
        stats.total_latency_ms = stats.total_latency_ms.saturating_add(millis);
        if !success {
            stats.failures += 1;
        }
    }

    fn record_retry(&self, operation: &str) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        self.operations
            .lock()
            .entry(operation.to_string())
            .or_default()
            .retries += 1;
    }

    fn record_error(&self, kind: ApiErrorKind) {
        self.errors[Self::slot(kind)].fetch_add(1, Ordering::Relaxed);
    }

    fn get_metrics(&self) -> RequestMetrics {
        let successful_requests = self.successful.load(Ordering::Relaxed);
        let failed_requests = self.failed.load(Ordering::Relaxed);

        let errors = KINDS
            .iter()
            .zip(&self.errors)
            .filter_map(|(kind, count)| {
                let count = count.load(Ordering::Relaxed);
                (count > 0).then_some((*kind, count))
            })
            .collect();

        RequestMetrics {
            total_requests: successful_requests + failed_requests,
            successful_requests,
            failed_requests,
            retries: self.retries.load(Ordering::Relaxed),
            total_latency_ms: self.latency_ms.load(Ordering::Relaxed),
            operations: self.operations.lock().clone(),
            errors,
        }
    }

    fn reset(&self) {
        for counter in [&self.successful, &self.failed, &self.retries, &self.latency_ms]
            .into_iter()
            .chain(&self.errors)
        {
            counter.store(0, Ordering::Relaxed);
        }
        self.operations.lock().clear();
    }
}

impl std::fmt::Debug for DefaultMetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultMetricsCollector")
            .field("successful", &self.successful.load(Ordering::Relaxed))
            .field("failed", &self.failed.load(Ordering::Relaxed))
            .field("retries", &self.retries.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Collector that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsCollector;

impl MetricsCollector for NoopMetricsCollector {
    fn record_request(&self, _operation: &str, _success: bool, _duration: Duration) {}

    fn record_retry(&self, _operation: &str) {}

    fn record_error(&self, _kind: ApiErrorKind) {}

    fn get_metrics(&self) -> RequestMetrics {
        RequestMetrics::default()
    }

    fn reset(&self) {}
}
