//! HTTP transport layer for the FinTrack client.
//!
//! A transport performs exactly one exchange per call and knows nothing
//! about credentials, retries or error classification.

mod http;

pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, HttpTransportImpl};

use std::collections::HashMap;
use std::time::Duration;

/// Multipart request for file uploads.
#[derive(Debug, Clone)]
pub struct MultipartRequest {
    /// Request path.
    pub path: String,
    /// Request headers. Must not contain a `Content-Type`; the boundary is
    /// chosen by the transport.
    pub headers: HashMap<String, String>,
    /// Multipart form parts.
    pub parts: Vec<MultipartPart>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

/// A part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartPart {
    /// Text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// File field.
    File {
        /// Field name.
        name: String,
        /// File name.
        filename: String,
        /// Content type.
        content_type: String,
        /// File data.
        data: Vec<u8>,
    },
}

impl MultipartPart {
    /// Creates a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates a file field.
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        MultipartPart::File {
            name: name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// Transport error types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection error (refused, reset, DNS).
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Timeout after {timeout:?}")]
    Timeout {
        /// Timeout duration.
        timeout: Duration,
    },

    /// The request could not be assembled.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
    },

    /// Invalid response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}
