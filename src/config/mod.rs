//! Configuration module for the FinTrack client.
//!
//! Provides the base URL, timeouts, retry settings, batch concurrency and
//! an optional initial token, either built in code or read from the
//! environment.

use secrecy::{ExposeSecret, SecretString};
use std::num::NonZeroUsize;
use std::time::Duration;
use url::Url;

use crate::auth::Credential;
use crate::errors::ConfigError;
use crate::resilience::RetryConfig;

/// Default base URL, the API's local development address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Default per-exchange timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("fintrack-client/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the base URL.
pub const ENV_BASE_URL: &str = "FINTRACK_BASE_URL";
/// Environment variable holding the timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "FINTRACK_TIMEOUT_SECS";
/// Environment variable holding the attempt budget.
pub const ENV_MAX_ATTEMPTS: &str = "FINTRACK_MAX_ATTEMPTS";
/// Environment variable holding the base retry delay in milliseconds.
pub const ENV_RETRY_BASE_MS: &str = "FINTRACK_RETRY_BASE_MS";
/// Environment variable holding the retry delay ceiling in milliseconds.
pub const ENV_RETRY_MAX_MS: &str = "FINTRACK_RETRY_MAX_MS";
/// Environment variable holding the batch concurrency bound.
pub const ENV_MAX_CONCURRENCY: &str = "FINTRACK_MAX_CONCURRENCY";
/// Environment variable holding an initial bearer token.
pub const ENV_TOKEN: &str = "FINTRACK_TOKEN";

/// Configuration for the FinTrack client.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against.
    pub base_url: Url,
    /// Per-exchange timeout.
    pub timeout: Duration,
    /// Retry settings.
    pub retry: RetryConfig,
    /// Batch concurrency bound; `None` is unbounded.
    pub max_concurrency: Option<NonZeroUsize>,
    /// Headers added to every request.
    pub custom_headers: Vec<(String, String)>,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Bearer token to seed the credential store with.
    pub(crate) token: Option<SecretString>,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FINTRACK_BASE_URL`: base URL (default `http://127.0.0.1:5000`)
    /// - `FINTRACK_TIMEOUT_SECS`: per-exchange timeout in seconds
    /// - `FINTRACK_MAX_ATTEMPTS`: total attempts per request
    /// - `FINTRACK_RETRY_BASE_MS` / `FINTRACK_RETRY_MAX_MS`: backoff bounds
    /// - `FINTRACK_MAX_CONCURRENCY`: batch concurrency bound
    /// - `FINTRACK_TOKEN`: initial bearer token
    ///
    /// Unset variables keep their defaults; set but malformed ones are an
    /// error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ClientConfigBuilder::new();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            builder = builder.base_url(base_url);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_TIMEOUT_SECS)? {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = parse_var::<u32, _>(&lookup, ENV_MAX_ATTEMPTS)? {
            builder = builder.max_attempts(attempts);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_RETRY_BASE_MS)? {
            builder = builder.retry_base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, ENV_RETRY_MAX_MS)? {
            builder = builder.retry_max_delay(Duration::from_millis(ms));
        }
        if let Some(bound) = parse_var::<usize, _>(&lookup, ENV_MAX_CONCURRENCY)? {
            builder = builder.max_concurrency(bound);
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            builder = builder.token(token);
        }

        builder.build()
    }

    /// Returns the initial token hint (last 4 characters) for debugging.
    pub fn token_hint(&self) -> Option<String> {
        self.token
            .as_ref()
            .and_then(|token| Credential::bearer(token.expose_secret().as_str()).hint())
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Environment {
                var: name.to_string(),
                reason: format!("'{}': {}", raw, e),
            }),
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("max_concurrency", &self.max_concurrency)
            .field("custom_headers", &self.custom_headers)
            .field("user_agent", &self.user_agent)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: RetryConfig,
    max_concurrency: Option<usize>,
    custom_headers: Vec<(String, String)>,
    user_agent: Option<String>,
    token: Option<String>,
}

impl ClientConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the per-exchange timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces all retry settings.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the total attempts per request.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.retry.max_attempts = attempts;
        self
    }

    /// Sets the delay before the first retry.
    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry.base_delay = delay;
        self
    }

    /// Sets the retry delay ceiling.
    pub fn retry_max_delay(mut self, delay: Duration) -> Self {
        self.retry.max_delay = delay;
        self
    }

    /// Enables or disables retry jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.retry.jitter = jitter;
        self
    }

    /// Bounds batch concurrency. Zero is rejected by [`build`](Self::build).
    pub fn max_concurrency(mut self, bound: usize) -> Self {
        self.max_concurrency = Some(bound);
        self
    }

    /// Adds a custom header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Seeds the credential store with a bearer token. Blank tokens are
    /// ignored.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let base_url = parse_base_url(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry.max_delay < self.retry.base_delay {
            return Err(ConfigError::InvalidValue {
                field: "retry_max_delay",
                reason: format!(
                    "{:?} is shorter than the base delay {:?}",
                    self.retry.max_delay, self.retry.base_delay
                ),
            });
        }

        let max_concurrency = match self.max_concurrency {
            None => None,
            Some(bound) => Some(NonZeroUsize::new(bound).ok_or_else(|| {
                ConfigError::InvalidValue {
                    field: "max_concurrency",
                    reason: "must be at least 1".to_string(),
                }
            })?),
        };

        let token = self
            .token
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::new);

        Ok(ClientConfig {
            base_url,
            timeout,
            retry: self.retry,
            max_concurrency,
            custom_headers: self.custom_headers,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            token,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a query or fragment".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::builder().build().unwrap();

        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:5000/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.max_concurrency, None);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ClientConfig::builder()
            .base_url("https://fintrack.example.com/api")
            .timeout(Duration::from_secs(5))
            .max_attempts(5)
            .retry_base_delay(Duration::from_millis(200))
            .retry_max_delay(Duration::from_secs(2))
            .max_concurrency(4)
            .header("X-Client", "dashboard")
            .token("jwt-123456")
            .build()
            .unwrap();

        assert_eq!(config.base_url.as_str(), "https://fintrack.example.com/api");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.max_concurrency, NonZeroUsize::new(4));
        assert_eq!(config.token_hint(), Some("...3456".to_string()));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        for url in ["not a url", "ftp://example.com", "http://example.com/?a=b"] {
            let result = ClientConfig::builder().base_url(url).build();
            assert!(
                matches!(result, Err(ConfigError::InvalidBaseUrl { .. })),
                "{} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let result = ClientConfig::builder().max_concurrency(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "max_concurrency",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_attempts_and_inverted_delays() {
        assert!(ClientConfig::builder().max_attempts(0).build().is_err());
        assert!(ClientConfig::builder()
            .retry_base_delay(Duration::from_secs(10))
            .retry_max_delay(Duration::from_secs(1))
            .build()
            .is_err());
    }

    #[test]
    fn test_token_hint_matches_credential_hint() {
        for token in ["abc", "abcd", "jwt-\u{e9}t\u{e9}42"] {
            let config = ClientConfig::builder().token(token).build().unwrap();
            assert_eq!(config.token_hint(), Credential::bearer(token).hint(), "{}", token);
        }
        assert_eq!(
            ClientConfig::builder().token("abc").build().unwrap().token_hint(),
            Some("****".to_string())
        );
        assert_eq!(ClientConfig::builder().build().unwrap().token_hint(), None);
    }

    #[test]
    fn test_blank_token_ignored() {
        let config = ClientConfig::builder().token("  ").build().unwrap();
        assert!(config.token.is_none());
    }

    #[test]
    fn test_from_env() {
        let config = ClientConfig::from_env_with(env(&[
            (ENV_BASE_URL, "https://api.example.com"),
            (ENV_TIMEOUT_SECS, "10"),
            (ENV_MAX_ATTEMPTS, "1"),
            (ENV_RETRY_BASE_MS, "250"),
            (ENV_RETRY_MAX_MS, "1000"),
            (ENV_MAX_CONCURRENCY, "2"),
            (ENV_TOKEN, "env-token"),
        ]))
        .unwrap();

        assert_eq!(config.base_url.as_str(), "https://api.example.com/");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert_eq!(config.retry.max_delay, Duration::from_secs(1));
        assert_eq!(config.max_concurrency, NonZeroUsize::new(2));
        assert!(config.token.is_some());
    }

    #[test]
    fn test_from_env_empty_uses_defaults() {
        let config = ClientConfig::from_env_with(env(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:5000/");
    }

    #[test]
    fn test_from_env_malformed_number() {
        let result = ClientConfig::from_env_with(env(&[(ENV_TIMEOUT_SECS, "soon")]));
        match result {
            Err(ConfigError::Environment { var, .. }) => assert_eq!(var, ENV_TIMEOUT_SECS),
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::builder()
            .token("very-secret-token")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("very-secret-token"));
    }
}
