//! Report types.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::transactions::Transaction;
use crate::errors::ApiResult;

/// Totals returned by `/balance` and `/summary`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Balance {
    /// Sum of income.
    pub income: f64,
    /// Sum of expenses.
    pub expense: f64,
    /// Income minus expenses.
    pub balance: f64,
}

/// A calendar month, formatted `YYYY-MM` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a month. Returns `None` unless `month` is 1-12 and `year`
    /// has four digits.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        ((1..=12).contains(&month) && (0..=9999).contains(&year)).then_some(Self { year, month })
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Year.
    pub fn year(self) -> i32 {
        self.year
    }

    /// Month, 1-12.
    pub fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid month '{}', expected YYYY-MM", s);
        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `/monthly-summary` response: spending per category for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// The month summarised.
    pub month: YearMonth,
    /// Category to total.
    pub summary: BTreeMap<String, f64>,
}

/// `/category-breakdown` response: category to total.
pub type CategoryBreakdown = BTreeMap<String, f64>;

/// `/summary-by-category` response: month to (category to total).
pub type SummaryByCategory = BTreeMap<YearMonth, BTreeMap<String, f64>>;

/// One row of `/monthly-income-expense`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyIncomeExpense {
    /// Month.
    pub month: YearMonth,
    /// Income in that month.
    pub income: f64,
    /// Expenses in that month.
    pub expense: f64,
}

/// One row of `/monthly-balance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    /// Month.
    pub month: YearMonth,
    /// Income minus expenses.
    pub balance: f64,
    /// Expenses in that month.
    pub expense: f64,
    /// Income in that month; older servers omit it.
    #[serde(default)]
    pub income: Option<f64>,
}

/// Data behind the dashboard's landing page.
///
/// Sections are fetched concurrently and fail independently.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    /// Overall totals.
    pub balance: ApiResult<Balance>,
    /// Most recent transactions.
    pub recent_transactions: ApiResult<Vec<Transaction>>,
    /// Spending per category for the requested month.
    pub monthly_summary: ApiResult<MonthlySummary>,
}

impl DashboardSnapshot {
    /// Returns true if every section loaded.
    pub fn is_complete(&self) -> bool {
        self.balance.is_ok() && self.recent_transactions.is_ok() && self.monthly_summary.is_ok()
    }

    /// Returns true if any section needs the user to sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        [
            self.balance.as_ref().err(),
            self.recent_transactions.as_ref().err(),
            self.monthly_summary.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .any(|error| error.requires_reauthentication())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_year_month_display_and_parse() {
        let month = YearMonth::new(2025, 3).unwrap();
        assert_eq!(month.to_string(), "2025-03");
        assert_eq!("2025-03".parse::<YearMonth>().unwrap(), month);
        assert_eq!(
            YearMonth::from_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()).to_string(),
            "2024-12"
        );
    }

    #[test_case("2025-13" ; "month out of range")]
    #[test_case("2025-3" ; "single digit month")]
    #[test_case("25-03" ; "short year")]
    #[test_case("March" ; "not a month")]
    fn test_year_month_rejects(raw: &str) {
        assert!(raw.parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_summary_by_category_keys() {
        let raw = r#"{"2025-01": {"Food": 120.0}, "2024-12": {"Rent": 900.0}}"#;
        let summary: SummaryByCategory = serde_json::from_str(raw).unwrap();

        let months: Vec<String> = summary.keys().map(ToString::to_string).collect();
        assert_eq!(months, vec!["2024-12", "2025-01"]);
    }

    #[test]
    fn test_monthly_balance_without_income() {
        let rows: Vec<MonthlyBalance> =
            serde_json::from_str(r#"[{"month":"2025-02","balance":-20.0,"expense":20.0}]"#)
                .unwrap();
        assert_eq!(rows[0].income, None);
    }
}
