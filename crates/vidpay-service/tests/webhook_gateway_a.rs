//! Gateway A webhook integration tests.

mod common;

use std::collections::BTreeMap;

use axum::http::StatusCode;
use common::{TestHarness, GATEWAY_A_SECRET};

use vidpay_core::{PayChannel, Transaction};
use vidpay_service::gateways::GatewayAVerifier;
use vidpay_store::Store;

/// Seed a pending gateway A claim directly in the store, the way the
/// checkout flow would have created it before redirecting to the
/// gateway.
async fn seed_claim(harness: &TestHarness, amount_cents: i64) -> String {
    let claim = harness
        .store
        .create_recharge(Transaction::recharge(
            harness.user_id,
            amount_cents,
            PayChannel::GatewayA,
        ))
        .await
        .unwrap();
    claim.id.to_string()
}

fn signed_notification(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut fields: BTreeMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let sign = GatewayAVerifier::new(GATEWAY_A_SECRET.to_string()).sign(&fields);
    fields.insert("sign".into(), sign);
    fields.insert("sign_type".into(), "HMAC-SHA256".into());
    fields
}

#[tokio::test]
async fn paid_notification_settles_the_claim() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    let fields = signed_notification(&[
        ("merchant_order_id", &order_id),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "5000"),
    ]);

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "success");
    assert_eq!(harness.balance().await, 5000);
}

#[tokio::test]
async fn duplicate_delivery_credits_once() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 200).await;

    let fields = signed_notification(&[
        ("merchant_order_id", &order_id),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "200"),
    ]);

    for _ in 0..2 {
        let response = harness
            .server
            .post("/webhook/gateway-a")
            .form(&fields)
            .await;
        response.assert_status_ok();
        assert_eq!(response.text(), "success");
    }

    assert_eq!(harness.balance().await, 200);
}

#[tokio::test]
async fn bad_signature_is_rejected_without_side_effects() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    let mut fields = signed_notification(&[
        ("merchant_order_id", &order_id),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "5000"),
    ]);
    // Tamper after signing.
    fields.insert("amount_cents".into(), "9999999".into());

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.text(), "fail");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn non_success_status_is_acked_without_effect() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    let fields = signed_notification(&[
        ("merchant_order_id", &order_id),
        ("trade_status", "WAIT_BUYER_PAY"),
        ("amount_cents", "5000"),
    ]);

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "success");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn unknown_order_is_a_correlation_fault() {
    let harness = TestHarness::new();

    let fields = signed_notification(&[
        ("merchant_order_id", "01ARZ3NDEKTSV4RRFFQ69G5FAV"),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "5000"),
    ]);

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "fail");
}

#[tokio::test]
async fn amount_mismatch_is_a_correlation_fault() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    // Correctly signed, but the gateway reports a different amount
    // than the ledger expects.
    let fields = signed_notification(&[
        ("merchant_order_id", &order_id),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "4999"),
    ]);

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "fail");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn gateway_cannot_settle_a_manual_claim() {
    let harness = TestHarness::new();
    let claim = harness
        .store
        .create_recharge(Transaction::recharge(
            harness.user_id,
            5000,
            PayChannel::Manual,
        ))
        .await
        .unwrap();

    let fields = signed_notification(&[
        ("merchant_order_id", &claim.id.to_string()),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "5000"),
    ]);

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "fail");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn unknown_fields_are_signed_and_accepted() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 300).await;

    let fields = signed_notification(&[
        ("merchant_order_id", &order_id),
        ("trade_status", "TRADE_SUCCESS"),
        ("amount_cents", "300"),
        ("gateway_batch_no", "B-20260826-17"),
    ]);

    let response = harness.server.post("/webhook/gateway-a").form(&fields).await;
    response.assert_status_ok();
    assert_eq!(response.text(), "success");
    assert_eq!(harness.balance().await, 300);
}
