//! Concurrent execution of independent requests.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::errors::{ApiError, ApiResult};
use crate::executor::{ApiResponse, RequestDescriptor, RequestExecutor};

/// One entry of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem<I> {
    /// Caller-chosen identifier, echoed back in the result.
    pub id: I,
    /// The request to run.
    pub request: RequestDescriptor,
    /// Cancels only this item.
    pub cancel: Option<CancellationToken>,
}

impl<I> BatchItem<I> {
    /// Creates an item.
    pub fn new(id: I, request: RequestDescriptor) -> Self {
        Self {
            id,
            request,
            cancel: None,
        }
    }

    /// Attaches a per-item cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Outcome of a batch: every submitted id appears exactly once, in either
/// `successes` or `failures`, in the order the items completed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<I, T> {
    /// Items that succeeded.
    pub successes: Vec<(I, T)>,
    /// Items that failed, with their terminal error.
    pub failures: Vec<(I, ApiError)>,
}

impl<I, T> Default for BatchResult<I, T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<I, T> BatchResult<I, T> {
    /// Total number of items.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Returns true if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every item succeeded.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Ids of the items that succeeded.
    pub fn success_ids(&self) -> impl Iterator<Item = &I> {
        self.successes.iter().map(|(id, _)| id)
    }

    /// Ids of the items that failed.
    pub fn failure_ids(&self) -> impl Iterator<Item = &I> {
        self.failures.iter().map(|(id, _)| id)
    }

    /// Returns the error recorded for `id`, if that item failed.
    pub fn failure(&self, id: &I) -> Option<&ApiError>
    where
        I: PartialEq,
    {
        self.failures
            .iter()
            .find(|(failed, _)| failed == id)
            .map(|(_, error)| error)
    }
}

/// Runs many logical requests concurrently and partitions their outcomes.
///
/// Every item goes through the executor's full retry loop on its own; one
/// item failing never cancels its siblings.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    executor: Arc<RequestExecutor>,
    max_concurrency: Option<NonZeroUsize>,
}

impl BatchCoordinator {
    /// Creates an unbounded coordinator.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            max_concurrency: None,
        }
    }

    /// Bounds the number of items in flight. `None` means unbounded.
    pub fn with_max_concurrency(mut self, max_concurrency: Option<NonZeroUsize>) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Returns the concurrency bound.
    pub fn max_concurrency(&self) -> Option<NonZeroUsize> {
        self.max_concurrency
    }

    /// Runs every item to completion.
    pub async fn run_all<I>(&self, items: Vec<BatchItem<I>>) -> BatchResult<I, ApiResponse> {
        self.run_all_with_cancel(items, &CancellationToken::new())
            .await
    }

    /// Runs every item to completion or until `cancel` fires, in which case
    /// unfinished items fail with [`ApiError::Cancelled`].
    pub async fn run_all_with_cancel<I>(
        &self,
        items: Vec<BatchItem<I>>,
        cancel: &CancellationToken,
    ) -> BatchResult<I, ApiResponse> {
        let inputs: Vec<_> = items
            .into_iter()
            .map(|item| (item.id, (item.request, item.cancel.unwrap_or_default())))
            .collect();

        let executor = &self.executor;
        self.run_all_with(inputs, cancel, |(request, item_cancel)| async move {
            executor.execute_with_cancel(&request, &item_cancel).await
        })
        .await
    }

    /// Runs `op` once per input, concurrently.
    ///
    /// `op` is any fallible async operation, typically one or more executor
    /// calls; services use this to batch typed operations.
    #[instrument(skip_all, fields(items = inputs.len()))]
    pub async fn run_all_with<I, P, T, F, Fut>(
        &self,
        inputs: Vec<(I, P)>,
        cancel: &CancellationToken,
        op: F,
    ) -> BatchResult<I, T>
    where
        F: Fn(P) -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        if inputs.is_empty() {
            return BatchResult::default();
        }

        let limit = self
            .max_concurrency
            .map_or(inputs.len(), NonZeroUsize::get);
        info!(limit, "Starting batch");

        let op = &op;
        let outcomes: Vec<(I, ApiResult<T>)> = stream::iter(inputs.into_iter().enumerate())
            .map(|(index, (id, payload))| {
                let cancel = cancel.clone();
                async move {
                    let outcome = tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(ApiError::Cancelled),
                        outcome = op(payload) => outcome,
                    };
                    debug!(index, success = outcome.is_ok(), "Batch item finished");
                    (id, outcome)
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        // `buffer_unordered` yields in completion order.
        let mut result = BatchResult::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(value) => result.successes.push((id, value)),
                Err(error) => result.failures.push((id, error)),
            }
        }

        info!(
            successes = result.successes.len(),
            failures = result.failures.len(),
            "Batch finished"
        );
        result
    }
}
