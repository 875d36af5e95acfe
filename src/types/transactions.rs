//! Transaction types.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    /// Money in.
    Income,
    /// Money out.
    Expense,
    /// Missing or unrecognised on the server.
    Other,
}

impl TransactionType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
            TransactionType::Other => "other",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TransactionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// The server stores the type as free text and may return null.
impl<'de> Deserialize<'de> for TransactionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("income") => TransactionType::Income,
            Some("expense") => TransactionType::Expense,
            _ => TransactionType::Other,
        })
    }
}

/// A stored transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Server-assigned id.
    pub id: i64,
    /// When the transaction happened.
    pub timestamp: NaiveDateTime,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Amount, always positive; direction is given by `kind`.
    pub amount: f64,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Category assigned by the server.
    #[serde(default)]
    pub category: Option<String>,
}

/// A transaction to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// Day the transaction happened.
    pub date: NaiveDate,
    /// Amount, positive.
    pub amount: f64,
    /// Income or expense.
    pub kind: TransactionType,
    /// Free-text description; the server derives the category from it.
    pub description: String,
}

impl NewTransaction {
    /// Creates an expense.
    pub fn expense(date: NaiveDate, amount: f64, description: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            kind: TransactionType::Expense,
            description: description.into(),
        }
    }

    /// Creates an income.
    pub fn income(date: NaiveDate, amount: f64, description: impl Into<String>) -> Self {
        Self {
            date,
            amount,
            kind: TransactionType::Income,
            description: description.into(),
        }
    }

    /// Request body for `POST /transactions`.
    ///
    /// The server parses `timestamp` as ISO-8601; `date` is kept for
    /// consumers that read the day only.
    pub(crate) fn to_wire(&self) -> NewTransactionBody<'_> {
        NewTransactionBody {
            date: self.date.format("%Y-%m-%d").to_string(),
            timestamp: self
                .date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default(),
            amount: self.amount,
            kind: self.kind,
            description: &self.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NewTransactionBody<'a> {
    date: String,
    timestamp: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: TransactionType,
    description: &'a str,
}

/// `POST /transactions` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedTransaction {
    /// Confirmation message.
    #[serde(default)]
    pub message: Option<String>,
    /// Category the server assigned.
    #[serde(default)]
    pub category: Option<String>,
    /// Any other fields the server returned.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Filters for `GET /transactions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Earliest day, inclusive.
    pub start: Option<NaiveDate>,
    /// Latest day, inclusive.
    pub end: Option<NaiveDate>,
    /// Exact category.
    pub category: Option<String>,
    /// Income or expense only.
    pub kind: Option<TransactionType>,
    /// Page size (server default 10).
    pub limit: Option<u32>,
    /// Rows to skip.
    pub offset: Option<u32>,
}

impl TransactionFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to transactions on or after `start`.
    pub fn start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    /// Restricts to transactions on or before `end`.
    pub fn end(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Restricts to one category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restricts to one direction.
    pub fn kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the page offset.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Query pairs in the server's parameter names.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(start) = self.start {
            query.push(("start".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end {
            query.push(("end".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        if let Some(category) = &self.category {
            query.push(("category".to_string(), category.clone()));
        }
        if let Some(kind) = self.kind {
            query.push(("type".to_string(), kind.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_deserialize_transaction() {
        let raw = r#"{
            "id": 7,
            "amount": 12.5,
            "category": "Food",
            "description": "Lunch",
            "type": "expense",
            "timestamp": "2025-07-22T14:30:00.123456"
        }"#;

        let txn: Transaction = serde_json::from_str(raw).unwrap();

        assert_eq!(txn.id, 7);
        assert_eq!(txn.kind, TransactionType::Expense);
        assert_eq!(txn.timestamp.date(), day(2025, 7, 22));
        assert_eq!(txn.description.as_deref(), Some("Lunch"));
    }

    #[test]
    fn test_type_tolerates_case_and_null() {
        let parse = |raw: &str| serde_json::from_str::<TransactionType>(raw).unwrap();
        assert_eq!(parse(r#""Income""#), TransactionType::Income);
        assert_eq!(parse("null"), TransactionType::Other);
        assert_eq!(parse(r#""transfer""#), TransactionType::Other);
    }

    #[test]
    fn test_new_transaction_wire_body() {
        let txn = NewTransaction::expense(day(2025, 7, 22), 40.0, "Groceries");
        let body = serde_json::to_value(txn.to_wire()).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "date": "2025-07-22",
                "timestamp": "2025-07-22T00:00:00",
                "amount": 40.0,
                "type": "expense",
                "description": "Groceries"
            })
        );
    }

    #[test]
    fn test_created_transaction_keeps_extra_fields() {
        let created: CreatedTransaction = serde_json::from_str(
            r#"{"message":"Transaction added successfully","category":"Food","id":3}"#,
        )
        .unwrap();

        assert_eq!(created.category.as_deref(), Some("Food"));
        assert_eq!(created.extra.get("id"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_filter_query() {
        let filter = TransactionFilter::new()
            .start(day(2025, 1, 1))
            .end(day(2025, 1, 31))
            .kind(TransactionType::Expense)
            .limit(50);

        assert_eq!(
            filter.to_query(),
            vec![
                ("start".to_string(), "2025-01-01".to_string()),
                ("end".to_string(), "2025-01-31".to_string()),
                ("type".to_string(), "expense".to_string()),
                ("limit".to_string(), "50".to_string()),
            ]
        );
        assert!(TransactionFilter::new().to_query().is_empty());
    }
}
