//! End-to-end tests for batch execution against a mock HTTP server.

mod common;

use std::time::Duration;

use chrono::NaiveDate;
use common::*;
use fintrack_client::{ApiErrorKind, BatchItem, NewTransaction, RequestDescriptor};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
}

#[tokio::test]
async fn test_create_many_partitions_outcomes() {
    let mock_server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .and(body_partial_json(json!({"description": "broken"})))
        .respond_with(error_response(400, "Invalid amount"))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .respond_with(success_response(json!({"message": "ok", "category": "Misc"})))
        .mount(&mock_server)
        .await;

    let client = signed_in_client_for(&mock_server, "jwt-abc");
    let result = client
        .transactions()
        .create_many(vec![
            NewTransaction::expense(day(1), 5.0, "coffee"),
            NewTransaction::expense(day(2), 0.0, "broken"),
            NewTransaction::income(day(3), 50.0, "refund"),
            NewTransaction::expense(day(4), 9.0, "broken"),
        ])
        .await;

    let mut success_ids: Vec<usize> = result.success_ids().copied().collect();
    let mut failure_ids: Vec<usize> = result.failure_ids().copied().collect();
    success_ids.sort_unstable();
    failure_ids.sort_unstable();

    assert_eq!(result.len(), 4);
    assert_eq!(success_ids, vec![0, 2]);
    assert_eq!(failure_ids, vec![1, 3]);
    assert_eq!(
        result.failure(&3).map(|e| e.kind()),
        Some(ApiErrorKind::HttpClient)
    );
}

#[tokio::test]
async fn test_run_all_keeps_caller_ids() {
    let mock_server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/balance"))
        .respond_with(success_response(
            json!({"income": 1.0, "expense": 0.0, "balance": 1.0}),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/summary"))
        .respond_with(error_response(403, "Forbidden"))
        .mount(&mock_server)
        .await;

    let client = signed_in_client_for(&mock_server, "jwt-abc");
    let result = client
        .batch()
        .run_all(vec![
            BatchItem::new("balance", RequestDescriptor::get("/balance")),
            BatchItem::new("summary", RequestDescriptor::get("/summary")),
        ])
        .await;

    assert_eq!(result.success_ids().copied().collect::<Vec<_>>(), vec!["balance"]);
    assert_eq!(
        result.failure(&"summary").map(|e| e.kind()),
        Some(ApiErrorKind::Auth)
    );
}

#[tokio::test]
async fn test_cancelled_batch_reports_every_item() {
    let mock_server = setup_mock_server().await;
    Mock::given(method("POST"))
        .and(path("/transactions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"category": "Misc"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = signed_in_client_for(&mock_server, "jwt-abc");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = client
        .transactions()
        .create_many_with_cancel(
            vec![
                NewTransaction::expense(day(1), 1.0, "a"),
                NewTransaction::expense(day(2), 2.0, "b"),
            ],
            &cancel,
        )
        .await;

    assert!(result.successes.is_empty());
    assert_eq!(result.failures.len(), 2);
    assert!(result
        .failures
        .iter()
        .all(|(_, error)| error.kind() == ApiErrorKind::Cancelled));
}
