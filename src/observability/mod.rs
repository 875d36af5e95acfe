//! Observability module for the FinTrack client.
//!
//! Provides tracing setup, log redaction and metrics for monitoring API
//! requests and client performance.

mod logging;
mod metrics;

pub use logging::{init_tracing, redact, LogConfig, LogFormat, LogLevel, LOG_ENV_VAR};
pub use metrics::{
    DefaultMetricsCollector, MetricsCollector, NoopMetricsCollector, OperationStats, RequestMetrics,
};
