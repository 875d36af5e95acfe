//! Retry policy implementation.

use std::time::Duration;

use crate::errors::{ApiError, Classification};

/// Default total attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default ceiling for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one. `1` disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Whether to add up to 25% random jitter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total number of attempts.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets whether to use jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Creates a configuration with no retries.
    pub fn no_retries() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then try again.
    Retry(Duration),
    /// Give up and return the error.
    Stop,
}

/// Retry policy with capped exponential backoff.
///
/// Retryability comes from the [`Classification`]; the policy only decides
/// timing and the attempt budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the total attempt budget (never less than one).
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Decides what happens after the attempt with zero-based index
    /// `attempt` failed with `failure`.
    pub fn next_delay(&self, attempt: u32, failure: &Classification) -> RetryDecision {
        if !failure.retryable || attempt.saturating_add(1) >= self.max_attempts() {
            return RetryDecision::Stop;
        }
        RetryDecision::Retry(self.calculate_delay(attempt))
    }

    /// Calculates `base_delay * 2^attempt`, capped at `max_delay`.
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let max_delay = self.config.max_delay;
        let uncapped = 2u32
            .checked_pow(attempt)
            .and_then(|factor| self.config.base_delay.checked_mul(factor))
            .unwrap_or(max_delay);

        // Jitter never exceeds 25%, so with doubling the sequence stays
        // non-decreasing.
        let delay = if self.config.jitter {
            uncapped.mul_f64(1.0 + rand::random::<f64>() * 0.25)
        } else {
            uncapped
        };

        delay.min(max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// Per-request retry bookkeeping.
///
/// Created when a logical request starts and dropped when it terminates.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    attempt: u32,
    last_error: Option<ApiError>,
    next_delay: Option<Duration>,
}

impl RetryState {
    /// Creates a fresh state with no attempts made.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attempts that have failed so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The most recent failure.
    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// The delay scheduled before the next attempt, if any.
    pub fn next_delay(&self) -> Option<Duration> {
        self.next_delay
    }

    /// Records a failed attempt and asks `policy` what to do next.
    pub fn record_failure(
        &mut self,
        policy: &RetryPolicy,
        failure: &Classification,
    ) -> RetryDecision {
        let decision = policy.next_delay(self.attempt, failure);
        self.attempt += 1;
        self.last_error = Some(failure.error.clone());
        self.next_delay = match decision {
            RetryDecision::Retry(delay) => Some(delay),
            RetryDecision::Stop => None,
        };
        decision
    }
}
