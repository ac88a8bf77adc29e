//! Gateway B webhook integration tests.

mod common;

use axum::http::StatusCode;
use common::{gateway_b_key_b64, TestHarness, GATEWAY_B_SECRET};
use serde_json::json;

use vidpay_core::{PayChannel, Transaction};
use vidpay_service::gateways::gateway_b::{PaymentResource, PaymentStatus};
use vidpay_service::gateways::GatewayBVerifier;
use vidpay_store::Store;

fn verifier() -> GatewayBVerifier {
    GatewayBVerifier::new(GATEWAY_B_SECRET.to_string(), &gateway_b_key_b64()).unwrap()
}

async fn seed_claim(harness: &TestHarness, amount_cents: i64) -> String {
    let claim = harness
        .store
        .create_recharge(Transaction::recharge(
            harness.user_id,
            amount_cents,
            PayChannel::GatewayB,
        ))
        .await
        .unwrap();
    claim.id.to_string()
}

/// Build a signed notification body for the given payment facts.
fn notification(merchant_order_id: &str, amount_cents: i64, status: PaymentStatus) -> String {
    let resource = verifier()
        .encrypt_resource(
            &PaymentResource {
                merchant_order_id: merchant_order_id.to_string(),
                amount_cents,
                status,
            },
            &[3u8; 12],
            "payment",
        )
        .unwrap();

    json!({
        "id": "evt_0001",
        "event_type": "PAYMENT.SUCCESS",
        "resource": resource
    })
    .to_string()
}

/// Deliver a body with valid signature headers. The raw bytes are sent
/// unmodified; the signature covers them exactly.
async fn deliver(harness: &TestHarness, body: &str) -> axum_test::TestResponse {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = verifier().sign(&timestamp, "nonce-1", body);

    harness
        .server
        .post("/webhook/gateway-b")
        .add_header("gateway-signature", signature)
        .add_header("gateway-serial", "SERIAL-1")
        .add_header("gateway-nonce", "nonce-1")
        .add_header("gateway-timestamp", timestamp)
        .bytes(body.to_owned().into())
        .await
}

#[tokio::test]
async fn paid_notification_settles_the_claim() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    let body = notification(&order_id, 5000, PaymentStatus::Paid);
    let response = deliver(&harness, &body).await;
    response.assert_status_ok();

    let ack: serde_json::Value = response.json();
    assert_eq!(ack["code"], "SUCCESS");
    assert_eq!(harness.balance().await, 5000);
}

#[tokio::test]
async fn duplicate_delivery_credits_once() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 200).await;
    let body = notification(&order_id, 200, PaymentStatus::Paid);

    for _ in 0..2 {
        let response = deliver(&harness, &body).await;
        response.assert_status_ok();
        let ack: serde_json::Value = response.json();
        assert_eq!(ack["code"], "SUCCESS");
    }

    assert_eq!(harness.balance().await, 200);
}

#[tokio::test]
async fn bad_signature_is_rejected_without_side_effects() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;
    let body = notification(&order_id, 5000, PaymentStatus::Paid);

    let timestamp = chrono::Utc::now().timestamp().to_string();
    let response = harness
        .server
        .post("/webhook/gateway-b")
        .add_header("gateway-signature", "deadbeef")
        .add_header("gateway-nonce", "nonce-1")
        .add_header("gateway-timestamp", timestamp)
        .bytes(body.into())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["code"], "FAIL");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;
    let body = notification(&order_id, 5000, PaymentStatus::Paid);

    let stale = (chrono::Utc::now().timestamp() - 3600).to_string();
    let signature = verifier().sign(&stale, "nonce-1", &body);
    let response = harness
        .server
        .post("/webhook/gateway-b")
        .add_header("gateway-signature", signature)
        .add_header("gateway-nonce", "nonce-1")
        .add_header("gateway-timestamp", stale)
        .bytes(body.into())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn missing_signature_headers_are_rejected() {
    let harness = TestHarness::new();
    let body = notification("T1", 100, PaymentStatus::Paid);

    let response = harness
        .server
        .post("/webhook/gateway-b")
        .bytes(body.into())
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_paid_statuses_are_acked_without_effect() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    for status in [PaymentStatus::Pending, PaymentStatus::Closed] {
        let body = notification(&order_id, 5000, status);
        let response = deliver(&harness, &body).await;
        response.assert_status_ok();
        let ack: serde_json::Value = response.json();
        assert_eq!(ack["code"], "SUCCESS");
    }

    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn amount_mismatch_is_a_correlation_fault() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 5000).await;

    let body = notification(&order_id, 4999, PaymentStatus::Paid);
    let response = deliver(&harness, &body).await;
    response.assert_status_ok();
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["code"], "FAIL");
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn unknown_envelope_fields_are_ignored() {
    let harness = TestHarness::new();
    let order_id = seed_claim(&harness, 700).await;

    let resource = verifier()
        .encrypt_resource(
            &PaymentResource {
                merchant_order_id: order_id,
                amount_cents: 700,
                status: PaymentStatus::Paid,
            },
            &[4u8; 12],
            "payment",
        )
        .unwrap();
    let body = json!({
        "id": "evt_0002",
        "event_type": "PAYMENT.SUCCESS",
        "resource": resource,
        "summary": "payment succeeded",
        "create_time": "2026-08-26T12:00:00Z"
    })
    .to_string();

    let response = deliver(&harness, &body).await;
    response.assert_status_ok();
    let ack: serde_json::Value = response.json();
    assert_eq!(ack["code"], "SUCCESS");
    assert_eq!(harness.balance().await, 700);
}
