//! FinTrack API client.
//!
//! Wires configuration, transport, credentials and retry policy into one
//! shared executor and hands out the services built on top of it.

use std::sync::Arc;
use tracing::debug;

use crate::auth::{Credential, CredentialStore, InMemoryCredentialStore};
use crate::config::{ClientConfig, ClientConfigBuilder};
use crate::errors::ConfigError;
use crate::executor::RequestExecutor;
use crate::observability::{DefaultMetricsCollector, MetricsCollector};
use crate::resilience::{BatchCoordinator, RetryPolicy};
use crate::services::{AuthService, ReportsService, TransactionsService, UploadService};
use crate::transport::{HttpTransport, HttpTransportImpl};
use secrecy::ExposeSecret;

/// The main FinTrack client.
///
/// # Example
///
/// ```rust,no_run
/// use fintrack_client::FinTrackClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = FinTrackClient::builder()
///         .base_url("http://127.0.0.1:5000")
///         .build()?;
///
///     client.auth().login("ana", "hunter2").await?;
///     let balance = client.reports().balance().await?;
///     println!("balance: {:.2}", balance.balance);
///     Ok(())
/// }
/// ```
pub struct FinTrackClient {
    config: ClientConfig,
    executor: Arc<RequestExecutor>,
    metrics: Arc<dyn MetricsCollector>,
    batch: BatchCoordinator,
    auth_service: AuthService,
    transactions_service: TransactionsService,
    reports_service: ReportsService,
    upload_service: UploadService,
}

impl FinTrackClient {
    /// Creates a new client builder.
    pub fn builder() -> FinTrackClientBuilder {
        FinTrackClientBuilder::new()
    }

    /// Creates a client from `FINTRACK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        FinTrackClientBuilder::from_config(ClientConfig::from_env()?).build()
    }

    /// Returns the auth service.
    pub fn auth(&self) -> &AuthService {
        &self.auth_service
    }

    /// Returns the transactions service.
    pub fn transactions(&self) -> &TransactionsService {
        &self.transactions_service
    }

    /// Returns the reports service.
    pub fn reports(&self) -> &ReportsService {
        &self.reports_service
    }

    /// Returns the upload service.
    pub fn uploads(&self) -> &UploadService {
        &self.upload_service
    }

    /// Returns the batch coordinator, bounded by the configured
    /// concurrency. Use it to run arbitrary requests as one batch.
    pub fn batch(&self) -> &BatchCoordinator {
        &self.batch
    }

    /// Returns the shared credential store.
    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        self.executor.credentials()
    }

    /// Returns the shared request executor.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Returns the metrics collector.
    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for FinTrackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinTrackClient")
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`FinTrackClient`].
pub struct FinTrackClientBuilder {
    config: ConfigSource,
    transport: Option<Arc<dyn HttpTransport>>,
    credentials: Option<Arc<dyn CredentialStore>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

enum ConfigSource {
    Builder(ClientConfigBuilder),
    Ready(ClientConfig),
}

impl FinTrackClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config: ConfigSource::Builder(ClientConfigBuilder::new()),
            transport: None,
            credentials: None,
            metrics: None,
        }
    }

    /// Creates a builder from an existing configuration.
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config: ConfigSource::Ready(config),
            ..Self::new()
        }
    }

    fn map_config(mut self, f: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder) -> Self {
        self.config = match self.config {
            ConfigSource::Builder(builder) => ConfigSource::Builder(f(builder)),
            ready @ ConfigSource::Ready(_) => ready,
        };
        self
    }

    /// Sets the base URL. Ignored when built from a finished config.
    pub fn base_url(self, base_url: impl Into<String>) -> Self {
        self.map_config(|c| c.base_url(base_url))
    }

    /// Sets the per-exchange timeout.
    pub fn timeout(self, timeout: std::time::Duration) -> Self {
        self.map_config(|c| c.timeout(timeout))
    }

    /// Sets the total attempts per request.
    pub fn max_attempts(self, attempts: u32) -> Self {
        self.map_config(|c| c.max_attempts(attempts))
    }

    /// Replaces all retry settings.
    pub fn retry(self, retry: crate::resilience::RetryConfig) -> Self {
        self.map_config(|c| c.retry(retry))
    }

    /// Bounds batch concurrency.
    pub fn max_concurrency(self, bound: usize) -> Self {
        self.map_config(|c| c.max_concurrency(bound))
    }

    /// Seeds the credential store with a bearer token.
    pub fn token(self, token: impl Into<String>) -> Self {
        self.map_config(|c| c.token(token))
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom credential store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Sets a custom metrics collector.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<FinTrackClient, ConfigError> {
        let config = match self.config {
            ConfigSource::Builder(builder) => builder.build()?,
            ConfigSource::Ready(config) => config,
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransportImpl::new(config.base_url.clone(), config.timeout).map_err(|e| {
                    ConfigError::Transport {
                        message: e.to_string(),
                    }
                })?,
            ),
        };

        let credentials: Arc<dyn CredentialStore> = self
            .credentials
            .unwrap_or_else(|| Arc::new(InMemoryCredentialStore::new()));
        if let Some(token) = &config.token {
            credentials.set(Credential::bearer(token.expose_secret().as_str()));
        }

        let metrics: Arc<dyn MetricsCollector> = self
            .metrics
            .unwrap_or_else(|| Arc::new(DefaultMetricsCollector::new()));

        let mut default_headers = config.custom_headers.clone();
        default_headers.push(("User-Agent".to_string(), config.user_agent.clone()));

        let executor = Arc::new(
            RequestExecutor::new(
                transport,
                credentials,
                RetryPolicy::new(config.retry.clone()),
            )
            .with_metrics(Arc::clone(&metrics))
            .with_default_headers(default_headers),
        );
        let batch = BatchCoordinator::new(Arc::clone(&executor))
            .with_max_concurrency(config.max_concurrency);

        debug!(base_url = %config.base_url, "FinTrack client built");

        Ok(FinTrackClient {
            auth_service: AuthService::new(Arc::clone(&executor)),
            transactions_service: TransactionsService::new(Arc::clone(&executor), batch.clone()),
            reports_service: ReportsService::new(Arc::clone(&executor)),
            upload_service: UploadService::new(Arc::clone(&executor)),
            config,
            executor,
            metrics,
            batch,
        })
    }
}

impl Default for FinTrackClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
