//! Resilience layer for the FinTrack client.
//!
//! Provides the retry policy used by the executor and the batch coordinator
//! that runs many logical requests concurrently.

mod batch;
mod retry;

pub use batch::{BatchCoordinator, BatchItem, BatchResult};
pub use retry::{
    RetryConfig, RetryDecision, RetryPolicy, RetryState, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY,
};
