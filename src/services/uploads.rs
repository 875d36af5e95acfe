//! Statement upload service.

use std::sync::Arc;
use tracing::instrument;

use crate::errors::{ApiError, ApiResult};
use crate::executor::{RequestDescriptor, RequestExecutor};
use crate::types::upload::{StatementFile, UploadResponse};

/// Bank statement uploads.
pub struct UploadService {
    executor: Arc<RequestExecutor>,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Uploads a statement as a multipart form.
    ///
    /// A 2xx answer that carries `{"error": ...}` is reported as
    /// [`ApiError::HttpClient`] with the body attached.
    #[instrument(skip(self, file), fields(filename = %file.filename, bytes = file.data.len()))]
    pub async fn upload_statement(&self, file: StatementFile) -> ApiResult<UploadResponse> {
        let request = RequestDescriptor::post("/upload").with_multipart(vec![file.into_part()]);
        let response = self.executor.execute(&request).await?;

        let status = response.status;
        let raw = response.json_value().map(ToString::to_string);
        let upload: UploadResponse = response.json()?;

        match upload.error {
            Some(message) => Err(ApiError::HttpClient {
                status,
                message,
                body: raw,
            }),
            None => Ok(upload),
        }
    }
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Credential, CredentialStore, InMemoryCredentialStore};
    use crate::errors::ApiErrorKind;
    use crate::mocks::{MockResponse, MockTransport};
    use crate::resilience::{RetryConfig, RetryPolicy};
    use crate::transport::{HttpTransport, MultipartPart};

    fn service(transport: &Arc<MockTransport>) -> UploadService {
        let executor = RequestExecutor::new(
            Arc::clone(transport) as Arc<dyn HttpTransport>,
            Arc::new(InMemoryCredentialStore::with_credential(Credential::bearer(
                "jwt",
            ))) as Arc<dyn CredentialStore>,
            RetryPolicy::new(RetryConfig::no_retries()),
        );
        UploadService::new(Arc::new(executor))
    }

    #[tokio::test]
    async fn test_upload_is_multipart() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_json(&serde_json::json!({"message": "File uploaded"}));

        let response = service(&transport)
            .upload_statement(StatementFile::new("march.csv", b"date,amount\n".to_vec()))
            .await
            .unwrap();

        assert_eq!(response.message.as_deref(), Some("File uploaded"));
        let request = transport.last_request().unwrap();
        assert!(request.multipart);
        assert_eq!(request.path, "/upload");
        assert!(!request.headers.contains_key("Content-Type"));
        assert!(matches!(
            &request.parts[0],
            MultipartPart::File { name, filename, .. } if name == "file" && filename == "march.csv"
        ));
    }

    #[tokio::test]
    async fn test_error_in_success_body() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_json(&serde_json::json!({"error": "Unsupported file format"}));

        let error = service(&transport)
            .upload_statement(StatementFile::new("march.docx", vec![1, 2, 3]))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ApiErrorKind::HttpClient);
        assert_eq!(error.status(), Some(200));
        assert_eq!(error.message(), "Unsupported file format");
        assert_eq!(
            error.body(),
            Some(r#"{"error":"Unsupported file format"}"#)
        );
    }
}
