//! Error types for the FinTrack client.
//!
//! Every failure a request can hit is reported as exactly one [`ApiError`].
//! Problems found while building a client, before any request exists, are
//! reported as [`ConfigError`] instead.

mod classify;

pub use classify::{Classification, ErrorClassifier};

use std::fmt;
use thiserror::Error;

/// Result type alias for FinTrack operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Discriminant of an [`ApiError`], useful for metrics and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The exchange never produced a response.
    Network,
    /// 4xx other than 401/403.
    HttpClient,
    /// 5xx.
    HttpServer,
    /// The payload could not be encoded or decoded.
    Decode,
    /// 401 or 403.
    Auth,
    /// The caller cancelled the request.
    Cancelled,
}

impl ApiErrorKind {
    /// Returns true if re-attempting the same exchange may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, ApiErrorKind::Network | ApiErrorKind::HttpServer)
    }

    /// Stable lowercase name, used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            ApiErrorKind::Network => "network",
            ApiErrorKind::HttpClient => "http_client",
            ApiErrorKind::HttpServer => "http_server",
            ApiErrorKind::Decode => "decode",
            ApiErrorKind::Auth => "auth",
            ApiErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every request made through the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout or a broken response stream.
    #[error("Network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Underlying cause, if known.
        cause: Option<String>,
    },

    /// The server rejected the request (4xx other than 401/403).
    #[error("Request rejected (HTTP {status}): {message}")]
    HttpClient {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Raw response body.
        body: Option<String>,
    },

    /// The server failed to handle the request (5xx).
    #[error("Server error (HTTP {status}): {message}")]
    HttpServer {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Raw response body.
        body: Option<String>,
    },

    /// The payload was malformed or did not have the expected shape.
    #[error("Decode error: {message}")]
    Decode {
        /// HTTP status of the response being decoded, if any.
        status: Option<u16>,
        /// Error message.
        message: String,
        /// Raw response body.
        body: Option<String>,
    },

    /// The credential was missing, expired or insufficient (401/403).
    #[error("Authentication failed (HTTP {status}): {message}")]
    Auth {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
        /// Raw response body.
        body: Option<String>,
    },

    /// The request was cancelled by the caller.
    #[error("Request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::Network { .. } => ApiErrorKind::Network,
            ApiError::HttpClient { .. } => ApiErrorKind::HttpClient,
            ApiError::HttpServer { .. } => ApiErrorKind::HttpServer,
            ApiError::Decode { .. } => ApiErrorKind::Decode,
            ApiError::Auth { .. } => ApiErrorKind::Auth,
            ApiError::Cancelled => ApiErrorKind::Cancelled,
        }
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Returns the HTTP status code, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpClient { status, .. }
            | ApiError::HttpServer { status, .. }
            | ApiError::Auth { status, .. } => Some(*status),
            ApiError::Decode { status, .. } => *status,
            ApiError::Network { .. } | ApiError::Cancelled => None,
        }
    }

    /// Returns the human readable message.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network { message, .. }
            | ApiError::HttpClient { message, .. }
            | ApiError::HttpServer { message, .. }
            | ApiError::Decode { message, .. }
            | ApiError::Auth { message, .. } => message,
            ApiError::Cancelled => "request cancelled",
        }
    }

    /// Returns the raw response payload, if one was received.
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::HttpClient { body, .. }
            | ApiError::HttpServer { body, .. }
            | ApiError::Decode { body, .. }
            | ApiError::Auth { body, .. } => body.as_deref(),
            ApiError::Network { .. } | ApiError::Cancelled => None,
        }
    }

    /// Returns true if the user should be asked to sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }

    /// Returns true for failures worth presenting as temporary.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::HttpServer { .. })
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a decode error that is not tied to a response.
    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::Decode {
            status: None,
            message: message.into(),
            body: None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::decode(err.to_string())
    }
}

/// Error raised while building a client or its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric or duration setting is out of range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// The setting name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// An environment variable could not be parsed.
    #[error("Environment variable {var} is invalid: {reason}")]
    Environment {
        /// Variable name.
        var: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP transport could not be constructed.
    #[error("Transport setup failed: {message}")]
    Transport {
        /// Error message.
        message: String,
    },
}
