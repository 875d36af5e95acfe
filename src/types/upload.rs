//! Statement upload types.

use serde::Deserialize;
use std::path::Path;

use crate::errors::{ApiError, ApiResult};
use crate::transport::MultipartPart;

/// Multipart field name the server reads the statement from.
pub const UPLOAD_FIELD: &str = "file";

/// A bank statement to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFile {
    /// File name sent to the server.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub data: Vec<u8>,
}

impl StatementFile {
    /// Creates a statement, guessing the MIME type from the extension.
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename).to_string();
        Self {
            filename,
            content_type,
            data,
        }
    }

    /// Overrides the MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Reads a statement from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            ApiError::decode(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statement".to_string());
        Ok(Self::new(filename, data))
    }

    pub(crate) fn into_part(self) -> MultipartPart {
        MultipartPart::file(UPLOAD_FIELD, self.filename, self.content_type, self.data)
    }
}

fn guess_content_type(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// `/upload` response body. The server may answer 2xx with `error` set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    /// Confirmation message.
    #[serde(default)]
    pub message: Option<String>,
    /// Failure reported in a success response.
    #[serde(default)]
    pub error: Option<String>,
}
