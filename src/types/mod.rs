//! Type definitions for the FinTrack API.
//!
//! Request and response payloads for authentication, transactions,
//! reports and statement uploads.

pub mod auth;
pub mod reports;
pub mod transactions;
pub mod upload;

pub use auth::{Credentials, LoginResponse, RegisterResponse};
pub use reports::{
    Balance, CategoryBreakdown, DashboardSnapshot, MonthlyBalance, MonthlyIncomeExpense,
    MonthlySummary, SummaryByCategory, YearMonth,
};
pub use transactions::{
    CreatedTransaction, NewTransaction, Transaction, TransactionFilter, TransactionType,
};
pub use upload::{StatementFile, UploadResponse};
