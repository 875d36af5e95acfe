//! FinTrack Client Library
//!
//! The data-access layer of the FinTrack personal finance dashboard. Every
//! call to the FinTrack REST API goes through one request executor that
//! attaches the bearer token, classifies failures into a small error
//! taxonomy and retries transient ones with exponential backoff.
//!
//! # Features
//!
//! - **Auth**: login, registration and a shared credential store
//! - **Transactions**: filtered listing, creation and concurrent batch creation
//! - **Reports**: balances, monthly summaries, category breakdowns, dashboard
//! - **Uploads**: bank statement upload as multipart form data
//! - **Resilience**: retry with backoff, cancellation, bounded batches
//! - **Observability**: tracing spans, structured logging, request metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fintrack_client::{FinTrackClient, NewTransaction, TransactionFilter};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FinTrackClient::from_env()?;
//!     client.auth().login("ana", "hunter2").await?;
//!
//!     let day = NaiveDate::from_ymd_opt(2025, 3, 14).ok_or("invalid date")?;
//!     client
//!         .transactions()
//!         .create(&NewTransaction::expense(day, 12.5, "Lunch"))
//!         .await?;
//!
//!     let recent = client
//!         .transactions()
//!         .list(&TransactionFilter::new().limit(5))
//!         .await?;
//!     println!("{} transactions", recent.len());
//!     Ok(())
//! }
//! ```
//!
//! # Batch Example
//!
//! ```rust,no_run
//! use fintrack_client::{FinTrackClient, NewTransaction};
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FinTrackClient::builder().max_concurrency(4).build()?;
//!     let day = NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("invalid date")?;
//!
//!     let result = client
//!         .transactions()
//!         .create_many(vec![
//!             NewTransaction::income(day, 3000.0, "Salary"),
//!             NewTransaction::expense(day, 900.0, "Rent"),
//!         ])
//!         .await;
//!
//!     for (index, error) in &result.failures {
//!         eprintln!("transaction {} failed: {}", index, error);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod executor;
pub mod observability;
pub mod resilience;
pub mod services;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use auth::{Credential, CredentialStore, InMemoryCredentialStore};
pub use client::{FinTrackClient, FinTrackClientBuilder};
pub use config::ClientConfig;
pub use errors::{ApiError, ApiErrorKind, ApiResult, ConfigError};
pub use executor::{ApiResponse, RequestDescriptor, RequestExecutor};
pub use resilience::{BatchCoordinator, BatchItem, BatchResult, RetryConfig, RetryPolicy};

// Type re-exports
pub use types::auth::{Credentials, LoginResponse, RegisterResponse};
pub use types::reports::{
    Balance, CategoryBreakdown, DashboardSnapshot, MonthlyBalance, MonthlyIncomeExpense,
    MonthlySummary, SummaryByCategory, YearMonth,
};
pub use types::transactions::{
    CreatedTransaction, NewTransaction, Transaction, TransactionFilter, TransactionType,
};
pub use types::upload::{StatementFile, UploadResponse};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
