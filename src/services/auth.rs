//! Authentication service.

use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::auth::Credential;
use crate::errors::{ApiError, ApiResult};
use crate::executor::{RequestDescriptor, RequestExecutor};
use crate::types::auth::{Credentials, LoginResponse, RegisterResponse};

/// Sign-in, sign-up and sign-out.
pub struct AuthService {
    executor: Arc<RequestExecutor>,
}

impl AuthService {
    /// Creates a new auth service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Signs in and stores the returned token for later requests.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<()> {
        let request =
            RequestDescriptor::post("/login").with_json(&Credentials::new(username, password))?;
        let response: LoginResponse = self.executor.execute_json(&request).await?;

        let credential = Credential::bearer(response.token.expose_secret().as_str());
        if !credential.is_present() {
            return Err(ApiError::decode("Login response did not include a token"));
        }

        info!(token = ?credential.hint(), "Signed in");
        self.executor.credentials().set(credential);
        Ok(())
    }

    /// Creates an account. Does not sign in.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> ApiResult<RegisterResponse> {
        let request = RequestDescriptor::post("/register")
            .with_json(&Credentials::new(username, password))?;
        self.executor.execute_json(&request).await
    }

    /// Forgets the stored token. No request is made.
    pub fn logout(&self) {
        info!("Signed out");
        self.executor.credentials().clear();
    }

    /// Returns true if a token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.executor.credentials().get().is_present()
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").finish_non_exhaustive()
    }
}
