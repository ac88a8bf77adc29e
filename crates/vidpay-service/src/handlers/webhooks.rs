//! Payment gateway webhook intake.
//!
//! Both gateways follow the same orchestration: verify the signature,
//! extract the payment facts, correlate against the ledger by
//! merchant-order-id, then settle through the store's idempotent
//! transition. The settle step is the only idempotency mechanism this
//! service needs: replayed notifications land on a terminal claim and
//! are acked as successes without any balance effect.
//!
//! Each gateway has its own ack dialect; neither uses the service's
//! JSON error shape.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use vidpay_core::{PayChannel, TransactionId};
use vidpay_store::{SettleOutcome, StoreError};

use crate::gateways::gateway_a::TRADE_SUCCESS;
use crate::gateways::gateway_b::{headers as gw_b_headers, EncryptedResource, PaymentStatus};
use crate::state::AppState;

/// Gateway A acks are literal plain-text bodies.
const ACK_SUCCESS: &str = "success";
const ACK_FAIL: &str = "fail";

/// What a verified notification asserts about a payment.
struct PaymentFacts {
    merchant_order_id: String,
    amount_cents: i64,
    channel: PayChannel,
}

/// Outcome of correlating and settling a verified payment.
enum Settlement {
    Settled,
    AlreadyProcessed,
    CorrelationFault,
    StoreFailure,
}

/// `POST /webhook/gateway-a`
///
/// Form-encoded, body-signed. Ack contract: literal `success` / `fail`.
pub async fn gateway_a(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> (StatusCode, &'static str) {
    let Some(verifier) = &state.gateway_a else {
        tracing::warn!("gateway A notification received but gateway A is not configured");
        return (StatusCode::UNAUTHORIZED, ACK_FAIL);
    };

    if !verifier.verify(&fields) {
        tracing::warn!("gateway A notification failed signature verification");
        return (StatusCode::UNAUTHORIZED, ACK_FAIL);
    }

    // Signature is good; from here on the notification is authentic.
    let trade_status = fields.get("trade_status").map_or("", String::as_str);
    if trade_status != TRADE_SUCCESS {
        tracing::info!(trade_status = %trade_status, "gateway A non-success status, ignoring");
        return (StatusCode::OK, ACK_SUCCESS);
    }

    let Some(merchant_order_id) = fields.get("merchant_order_id") else {
        tracing::warn!("gateway A notification missing merchant_order_id");
        return (StatusCode::OK, ACK_FAIL);
    };
    let Some(amount_cents) = fields.get("amount_cents").and_then(|v| v.parse().ok()) else {
        tracing::warn!("gateway A notification missing or invalid amount_cents");
        return (StatusCode::OK, ACK_FAIL);
    };

    let facts = PaymentFacts {
        merchant_order_id: merchant_order_id.clone(),
        amount_cents,
        channel: PayChannel::GatewayA,
    };
    match settle_payment(&state, &facts).await {
        Settlement::Settled | Settlement::AlreadyProcessed => (StatusCode::OK, ACK_SUCCESS),
        Settlement::CorrelationFault => (StatusCode::OK, ACK_FAIL),
        Settlement::StoreFailure => (StatusCode::INTERNAL_SERVER_ERROR, ACK_FAIL),
    }
}

/// Gateway B notification envelope. Unknown fields are ignored for
/// forward compatibility.
#[derive(Debug, Deserialize)]
pub struct GatewayBNotification {
    /// Notification id (logged for correlation).
    #[serde(default)]
    pub id: Option<String>,
    /// Event type (logged; only payment events carry a resource).
    #[serde(default)]
    pub event_type: Option<String>,
    /// The encrypted payment payload.
    pub resource: EncryptedResource,
}

/// Gateway B ack body.
#[derive(Debug, Serialize)]
pub struct GatewayBAck {
    /// `SUCCESS` or `FAIL`.
    pub code: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl GatewayBAck {
    fn success(message: &str) -> Json<Self> {
        Json(Self {
            code: "SUCCESS",
            message: message.to_string(),
        })
    }

    fn fail(message: &str) -> Json<Self> {
        Json(Self {
            code: "FAIL",
            message: message.to_string(),
        })
    }
}

/// `POST /webhook/gateway-b`
///
/// JSON with signature headers and an encrypted resource. Ack contract:
/// JSON `{code, message}`.
pub async fn gateway_b(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<GatewayBAck>) {
    let Some(verifier) = &state.gateway_b else {
        tracing::warn!("gateway B notification received but gateway B is not configured");
        return (
            StatusCode::UNAUTHORIZED,
            GatewayBAck::fail("gateway not configured"),
        );
    };

    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(signature), Some(nonce), Some(timestamp)) = (
        header(gw_b_headers::SIGNATURE),
        header(gw_b_headers::NONCE),
        header(gw_b_headers::TIMESTAMP),
    ) else {
        tracing::warn!("gateway B notification missing signature headers");
        return (
            StatusCode::UNAUTHORIZED,
            GatewayBAck::fail("missing signature headers"),
        );
    };

    if !verifier.verify(timestamp, nonce, &body, signature) {
        tracing::warn!(
            serial = header(gw_b_headers::SERIAL).unwrap_or("-"),
            "gateway B notification failed signature verification"
        );
        return (
            StatusCode::UNAUTHORIZED,
            GatewayBAck::fail("invalid signature"),
        );
    }

    let notification: GatewayBNotification = match serde_json::from_str(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "gateway B notification body is not valid JSON");
            return (StatusCode::OK, GatewayBAck::fail("malformed body"));
        }
    };

    tracing::info!(
        notification_id = notification.id.as_deref().unwrap_or("-"),
        event_type = notification.event_type.as_deref().unwrap_or("-"),
        "gateway B notification verified"
    );

    let resource = match verifier.decrypt_resource(&notification.resource) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "gateway B resource decryption failed");
            return (StatusCode::OK, GatewayBAck::fail("undecryptable resource"));
        }
    };

    if resource.status != PaymentStatus::Paid {
        tracing::info!(status = ?resource.status, "gateway B non-paid status, ignoring");
        return (StatusCode::OK, GatewayBAck::success("ignored"));
    }

    let facts = PaymentFacts {
        merchant_order_id: resource.merchant_order_id,
        amount_cents: resource.amount_cents,
        channel: PayChannel::GatewayB,
    };
    match settle_payment(&state, &facts).await {
        Settlement::Settled => (StatusCode::OK, GatewayBAck::success("settled")),
        Settlement::AlreadyProcessed => {
            (StatusCode::OK, GatewayBAck::success("already processed"))
        }
        Settlement::CorrelationFault => (StatusCode::OK, GatewayBAck::fail("correlation fault")),
        Settlement::StoreFailure => (
            StatusCode::INTERNAL_SERVER_ERROR,
            GatewayBAck::fail("storage failure"),
        ),
    }
}

/// Correlate a verified payment against the ledger and settle it.
///
/// Correlation faults (unknown merchant-order-id, amount mismatch,
/// wrong channel) are logged for manual reconciliation and reported as
/// failures so the gateway keeps retrying while an operator looks.
async fn settle_payment(state: &AppState, facts: &PaymentFacts) -> Settlement {
    let Ok(id) = facts.merchant_order_id.parse::<TransactionId>() else {
        tracing::warn!(
            merchant_order_id = %facts.merchant_order_id,
            "webhook merchant_order_id is not a transaction id"
        );
        return Settlement::CorrelationFault;
    };

    let claim = match state.store.get_transaction(id).await {
        Ok(Some(claim)) => claim,
        Ok(None) => {
            tracing::warn!(
                transaction_id = %id,
                "webhook references unknown transaction"
            );
            return Settlement::CorrelationFault;
        }
        Err(e) => {
            tracing::error!(error = %e, transaction_id = %id, "ledger lookup failed");
            return Settlement::StoreFailure;
        }
    };

    if claim.amount_cents != facts.amount_cents {
        tracing::warn!(
            transaction_id = %id,
            ledger_cents = claim.amount_cents,
            notified_cents = facts.amount_cents,
            "webhook amount does not match ledger"
        );
        return Settlement::CorrelationFault;
    }
    if claim.channel != facts.channel {
        tracing::warn!(
            transaction_id = %id,
            ledger_channel = %claim.channel,
            notified_channel = %facts.channel,
            "webhook channel does not match ledger"
        );
        return Settlement::CorrelationFault;
    }

    match state.store.settle_recharge(id).await {
        Ok(SettleOutcome::Applied {
            transaction,
            new_balance_cents,
        }) => {
            tracing::info!(
                transaction_id = %id,
                user_id = %transaction.user_id,
                amount_cents = transaction.amount_cents,
                new_balance_cents,
                channel = %facts.channel,
                "gateway payment settled"
            );
            state
                .notifier
                .notify(
                    transaction.user_id,
                    &format!(
                        "Your recharge of {} cents was received. New balance: {} cents.",
                        transaction.amount_cents, new_balance_cents
                    ),
                )
                .await;
            Settlement::Settled
        }
        Ok(SettleOutcome::AlreadyProcessed) => {
            tracing::info!(transaction_id = %id, "duplicate gateway notification, no effect");
            Settlement::AlreadyProcessed
        }
        Err(StoreError::NotFound { .. }) => Settlement::CorrelationFault,
        Err(e) => {
            tracing::error!(error = %e, transaction_id = %id, "settlement failed");
            Settlement::StoreFailure
        }
    }
}
