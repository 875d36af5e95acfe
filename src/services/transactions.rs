//! Transactions service.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::errors::ApiResult;
use crate::executor::{RequestDescriptor, RequestExecutor};
use crate::resilience::{BatchCoordinator, BatchResult};
use crate::types::transactions::{
    CreatedTransaction, NewTransaction, Transaction, TransactionFilter,
};

/// Listing and recording transactions.
pub struct TransactionsService {
    executor: Arc<RequestExecutor>,
    batch: BatchCoordinator,
}

impl TransactionsService {
    /// Creates a new transactions service.
    pub fn new(executor: Arc<RequestExecutor>, batch: BatchCoordinator) -> Self {
        Self { executor, batch }
    }

    /// Lists transactions, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &TransactionFilter) -> ApiResult<Vec<Transaction>> {
        let request = RequestDescriptor::get("/transactions").with_query_pairs(filter.to_query());
        self.executor.execute_json(&request).await
    }

    /// Lists the signed-in user's transactions.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self) -> ApiResult<Vec<Transaction>> {
        self.executor
            .execute_json(&RequestDescriptor::get("/transactions/user"))
            .await
    }

    /// Records one transaction.
    #[instrument(skip(self, transaction), fields(kind = %transaction.kind))]
    pub async fn create(&self, transaction: &NewTransaction) -> ApiResult<CreatedTransaction> {
        let request = Self::create_request(transaction)?;
        self.executor.execute_json(&request).await
    }

    /// Records many transactions concurrently.
    ///
    /// Results are keyed by each transaction's index in `transactions`.
    pub async fn create_many(
        &self,
        transactions: Vec<NewTransaction>,
    ) -> BatchResult<usize, CreatedTransaction> {
        self.create_many_with_cancel(transactions, &CancellationToken::new())
            .await
    }

    /// Cancellable form of [`create_many`](Self::create_many).
    #[instrument(skip_all, fields(count = transactions.len()))]
    pub async fn create_many_with_cancel(
        &self,
        transactions: Vec<NewTransaction>,
        cancel: &CancellationToken,
    ) -> BatchResult<usize, CreatedTransaction> {
        let inputs: Vec<_> = transactions.into_iter().enumerate().collect();
        let executor = &self.executor;

        self.batch
            .run_all_with(inputs, cancel, |transaction| async move {
                let request = Self::create_request(&transaction)?;
                executor
                    .execute_json::<CreatedTransaction>(&request)
                    .await
            })
            .await
    }

    fn create_request(transaction: &NewTransaction) -> ApiResult<RequestDescriptor> {
        RequestDescriptor::post("/transactions").with_json(&transaction.to_wire())
    }
}

impl std::fmt::Debug for TransactionsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionsService")
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}
