//! Service implementations for the FinTrack API.
//!
//! Each service maps typed operations onto endpoint paths and runs them
//! through the shared [`RequestExecutor`](crate::executor::RequestExecutor).

mod auth;
mod reports;
mod transactions;
mod uploads;

pub use auth::AuthService;
pub use reports::{ReportsService, DEFAULT_RECENT_TRANSACTIONS};
pub use transactions::TransactionsService;
pub use uploads::UploadService;
