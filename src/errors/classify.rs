//! Mapping from raw exchange outcomes to [`ApiError`].
//!
//! This is the only place that decides which failures are retryable.

use serde_json::Value;

use super::ApiError;
use crate::executor::{ContentKind, ResponseBody};
use crate::transport::{HttpResponse, TransportError};

/// A classified failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The typed error.
    pub error: ApiError,
    /// Whether re-attempting the same exchange may succeed.
    pub retryable: bool,
}

impl From<ApiError> for Classification {
    fn from(error: ApiError) -> Self {
        let retryable = error.is_retryable();
        Self { error, retryable }
    }
}

/// Classifies transport failures and HTTP responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classifies an exchange that never produced a response.
    pub fn classify_transport(err: &TransportError) -> Classification {
        let cause = match err {
            TransportError::Connection { .. } => "connection",
            TransportError::Timeout { .. } => "timeout",
            TransportError::InvalidRequest { .. } => "request",
            TransportError::InvalidResponse { .. } => "response",
        };
        let error = ApiError::Network {
            message: err.to_string(),
            cause: Some(cause.to_string()),
        };
        // A request that could not be built fails the same way every time.
        let retryable = !matches!(err, TransportError::InvalidRequest { .. });
        Classification { error, retryable }
    }

    /// Classifies a received response.
    ///
    /// A 2xx response is decoded according to `kind`; everything else, and
    /// any 2xx body that fails to decode, becomes a [`Classification`].
    pub fn classify_response(
        response: &HttpResponse,
        kind: ContentKind,
    ) -> Result<ResponseBody, Classification> {
        if response.is_success() {
            return Self::decode_body(response, kind);
        }
        Err(Self::classify_status(response.status, &response.body))
    }

    /// Classifies a non-2xx status code.
    pub fn classify_status(status: u16, body: &[u8]) -> Classification {
        let message = error_message(status, body);
        let body = raw_body(body);

        let error = match status {
            401 | 403 => ApiError::Auth {
                status,
                message,
                body,
            },
            500..=u16::MAX => ApiError::HttpServer {
                status,
                message,
                body,
            },
            // 4xx, plus anything else that is neither success nor server
            // failure (an unfollowed redirect, an informational status).
            _ => ApiError::HttpClient {
                status,
                message,
                body,
            },
        };
        Classification::from(error)
    }

    fn decode_body(
        response: &HttpResponse,
        kind: ContentKind,
    ) -> Result<ResponseBody, Classification> {
        match kind {
            ContentKind::Json => {
                if response.body.is_empty() && response.status == 204 {
                    return Ok(ResponseBody::Json(Value::Null));
                }
                serde_json::from_slice(&response.body)
                    .map(ResponseBody::Json)
                    .map_err(|e| {
                        Classification::from(ApiError::Decode {
                            status: Some(response.status),
                            message: format!("Failed to parse JSON response: {}", e),
                            body: raw_body(&response.body),
                        })
                    })
            }
            ContentKind::Text => String::from_utf8(response.body.clone())
                .map(ResponseBody::Text)
                .map_err(|e| {
                    Classification::from(ApiError::Decode {
                        status: Some(response.status),
                        message: format!("Response is not valid UTF-8: {}", e),
                        body: raw_body(&response.body),
                    })
                }),
            ContentKind::Binary => Ok(ResponseBody::Binary(response.body.clone())),
        }
    }
}

/// Picks the most useful message from an error body.
///
/// The API answers failures with `{"error": "..."}`; some proxies use
/// `{"message": "..."}` or `{"error": {"message": "..."}}`.
fn error_message(status: u16, body: &[u8]) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_slice::<Value>(body) {
        let found = match map.get("error") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
        .or_else(|| {
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        if let Some(message) = found {
            return message;
        }
    }

    match http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("HTTP {} {}", status, reason),
        None => format!("HTTP {}", status),
    }
}

fn raw_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(body).into_owned())
    }
}
