//! Request descriptors and decoded responses.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{ApiError, ApiResult};
use crate::transport::{HttpMethod, MultipartPart};

/// How a response body is expected to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    /// A JSON document.
    #[default]
    Json,
    /// UTF-8 text.
    Text,
    /// Opaque bytes.
    Binary,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document, sent with `Content-Type: application/json`.
    Json(Value),
    /// Raw bytes with an explicit content type.
    Bytes {
        /// Payload.
        data: Vec<u8>,
        /// MIME type.
        content_type: String,
    },
    /// Multipart form; the transport picks the boundary.
    Multipart(Vec<MultipartPart>),
}

/// One logical request.
///
/// Built with the consuming `with_*` methods and read-only afterwards; the
/// executor only ever borrows it, so the same descriptor is resent verbatim
/// on every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    accept: ContentKind,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Creates a descriptor with no body that expects JSON back.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            accept: ContentKind::Json,
            timeout: None,
        }
    }

    /// Creates a GET descriptor.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// Creates a POST descriptor.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    /// Creates a PUT descriptor.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    /// Creates a PATCH descriptor.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    /// Creates a DELETE descriptor.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Appends several query parameters.
    pub fn with_query_pairs<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(pairs);
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::decode(format!("Failed to encode request body: {}", e)))?;
        Ok(self.with_json_value(value))
    }

    /// Sets a pre-built JSON payload.
    pub fn with_json_value(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Sets a raw payload.
    pub fn with_bytes(mut self, data: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Bytes {
            data,
            content_type: content_type.into(),
        });
        self
    }

    /// Sets a multipart payload.
    pub fn with_multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = Some(RequestBody::Multipart(parts));
        self
    }

    /// Declares the expected response encoding.
    pub fn accept(mut self, kind: ContentKind) -> Self {
        self.accept = kind;
        self
    }

    /// Overrides the per-exchange timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Request body.
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Expected response encoding.
    pub fn accepts(&self) -> ContentKind {
        self.accept
    }

    /// Per-exchange timeout override.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Label used for logs and metrics, e.g. `GET /balance`.
    pub fn operation(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed JSON.
    Json(Value),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, keyed by lowercase name.
    pub headers: HashMap<String, String>,
    /// Decoded body.
    pub body: ResponseBody,
}

impl ApiResponse {
    /// Returns the JSON body, if the response was decoded as JSON.
    pub fn json_value(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Deserializes the body into `T`.
    ///
    /// A shape mismatch is a [`ApiError::Decode`] carrying the raw body.
    pub fn json<T: DeserializeOwned>(self) -> ApiResult<T> {
        let status = self.status;
        let value = match self.body {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => serde_json::from_str(&text).map_err(|e| {
                ApiError::Decode {
                    status: Some(status),
                    message: format!("Failed to parse JSON response: {}", e),
                    body: Some(text.clone()),
                }
            })?,
            ResponseBody::Binary(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ApiError::Decode {
                    status: Some(status),
                    message: format!("Failed to parse JSON response: {}", e),
                    body: Some(String::from_utf8_lossy(&bytes).into_owned()),
                }
            })?,
        };

        let raw = value.to_string();
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            status: Some(status),
            message: format!("Unexpected response shape: {}", e),
            body: Some(raw),
        })
    }

    /// Returns the body as text, if it was decoded as text.
    pub fn text(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }
}
