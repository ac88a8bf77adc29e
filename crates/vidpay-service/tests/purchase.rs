//! Purchase and ledger integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn purchase_debits_and_records_order() {
    let harness = TestHarness::new();
    harness.fund(10_000).await;

    let response = harness
        .server
        .post("/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({
            "item_id": "vid_42",
            "price_cents": 2500,
            "license_type": "commercial"
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body["order_id"].as_str().is_some());
    assert!(body["transaction_id"].as_str().is_some());
    assert_eq!(body["balance_cents"], 7500);
    assert_eq!(harness.balance().await, 7500);
}

#[tokio::test]
async fn purchase_beyond_balance_is_payment_required() {
    let harness = TestHarness::new();
    harness.fund(1000).await;

    let response = harness
        .server
        .post("/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "item_id": "vid_1", "price_cents": 1500 }))
        .await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_balance");
    assert_eq!(body["error"]["details"]["balance_cents"], 1000);
    assert_eq!(body["error"]["details"]["required_cents"], 1500);

    // The failed attempt left no trace.
    assert_eq!(harness.balance().await, 1000);
}

#[tokio::test]
async fn purchase_validates_input() {
    let harness = TestHarness::new();
    harness.fund(1000).await;

    harness
        .server
        .post("/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "item_id": "", "price_cents": 100 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    harness
        .server
        .post("/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "item_id": "vid_1", "price_cents": 0 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn eleventh_purchase_in_window_is_rate_limited() {
    let harness = TestHarness::new();
    harness.fund(100_000).await;

    for i in 0..10 {
        harness
            .server
            .post("/purchase")
            .add_header("authorization", harness.auth_header())
            .json(&json!({ "item_id": format!("vid_{i}"), "price_cents": 100 }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .post("/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "item_id": "vid_11", "price_cents": 100 }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());

    // Denied calls do not debit.
    assert_eq!(harness.balance().await, 99_000);
}

#[tokio::test]
async fn ledger_lists_newest_first() {
    let harness = TestHarness::new();
    harness.fund(10_000).await;

    for (item, price) in [("vid_a", 100), ("vid_b", 200), ("vid_c", 300)] {
        harness
            .server
            .post("/purchase")
            .add_header("authorization", harness.auth_header())
            .json(&json!({ "item_id": item, "price_cents": price }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .get("/transactions")
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();

    // 1 income + 3 purchases, newest first.
    assert_eq!(transactions.len(), 4);
    assert_eq!(transactions[0]["origin"], "purchase");
    assert_eq!(transactions[0]["amount_cents"], 300);
    assert_eq!(transactions[3]["origin"], "income");

    // Paging.
    let response = harness
        .server
        .get("/transactions?limit=2&offset=1")
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let page = body["transactions"].as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["amount_cents"], 200);
}

#[tokio::test]
async fn balance_reflects_lifetime_counters() {
    let harness = TestHarness::new();
    harness.fund(5000).await;

    harness
        .server
        .post("/purchase")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "item_id": "vid_1", "price_cents": 2000 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/balance")
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance_cents"], 3000);
    assert_eq!(body["lifetime_recharged_cents"], 5000);
    assert_eq!(body["lifetime_spent_cents"], 2000);
}
