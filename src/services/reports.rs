//! Reports service.

use std::sync::Arc;
use tracing::{instrument, warn};

use crate::errors::ApiResult;
use crate::executor::{RequestDescriptor, RequestExecutor};
use crate::types::reports::{
    Balance, CategoryBreakdown, DashboardSnapshot, MonthlyBalance, MonthlyIncomeExpense,
    MonthlySummary, SummaryByCategory, YearMonth,
};
use crate::types::transactions::{TransactionFilter, TransactionType};

/// Number of transactions shown on the dashboard.
pub const DEFAULT_RECENT_TRANSACTIONS: u32 = 10;

/// Aggregated views over the user's transactions.
pub struct ReportsService {
    executor: Arc<RequestExecutor>,
}

impl ReportsService {
    /// Creates a new reports service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Overall income, expense and balance.
    #[instrument(skip(self))]
    pub async fn balance(&self) -> ApiResult<Balance> {
        self.get("/balance").await
    }

    /// Same totals as [`balance`](Self::balance), from `/summary`.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> ApiResult<Balance> {
        self.get("/summary").await
    }

    /// Spending per category for one month.
    #[instrument(skip(self), fields(month = %month))]
    pub async fn monthly_summary(&self, month: YearMonth) -> ApiResult<MonthlySummary> {
        let request = RequestDescriptor::get("/monthly-summary").with_query("month", month);
        self.executor.execute_json(&request).await
    }

    /// Totals per category for income or expenses.
    #[instrument(skip(self))]
    pub async fn category_breakdown(&self, kind: TransactionType) -> ApiResult<CategoryBreakdown> {
        let request = RequestDescriptor::get("/category-breakdown").with_query("type", kind);
        self.executor.execute_json(&request).await
    }

    /// Income and expenses per month, oldest first.
    #[instrument(skip(self))]
    pub async fn monthly_income_expense(&self) -> ApiResult<Vec<MonthlyIncomeExpense>> {
        self.get("/monthly-income-expense").await
    }

    /// Net balance per month, oldest first.
    #[instrument(skip(self))]
    pub async fn monthly_balance(&self) -> ApiResult<Vec<MonthlyBalance>> {
        self.get("/monthly-balance").await
    }

    /// Expense totals per category for every month.
    #[instrument(skip(self))]
    pub async fn summary_by_category(&self) -> ApiResult<SummaryByCategory> {
        self.get("/summary-by-category").await
    }

    /// Loads the dashboard: balance, the `recent` newest transactions and
    /// the summary for `month`, concurrently.
    ///
    /// Never fails as a whole; each section carries its own result.
    #[instrument(skip(self), fields(month = %month))]
    pub async fn dashboard(&self, month: YearMonth, recent: u32) -> DashboardSnapshot {
        let recent_request = RequestDescriptor::get("/transactions")
            .with_query_pairs(TransactionFilter::new().limit(recent).to_query());

        let (balance, recent_transactions, monthly_summary) = tokio::join!(
            self.balance(),
            self.executor.execute_json(&recent_request),
            self.monthly_summary(month),
        );

        let snapshot = DashboardSnapshot {
            balance,
            recent_transactions,
            monthly_summary,
        };
        if !snapshot.is_complete() {
            warn!("Dashboard loaded partially");
        }
        snapshot
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.executor
            .execute_json(&RequestDescriptor::get(path))
            .await
    }
}

impl std::fmt::Debug for ReportsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportsService").finish_non_exhaustive()
    }
}
