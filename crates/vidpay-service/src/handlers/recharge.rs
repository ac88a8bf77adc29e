//! Recharge claim submission and admin review.
//!
//! A manual recharge is a claim: the user asserts they paid through the
//! marketplace's QR channel, and a human admin settles or rejects the
//! claim. The claim credits nothing until it is settled.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vidpay_core::{validate_amount, PayChannel, Transaction, TransactionId, TxStatus, UserId};
use vidpay_store::SettleOutcome;

use crate::auth::{AdminAuth, AuthUser};
use crate::error::ApiError;
use crate::ratelimit;
use crate::state::AppState;

/// Manual recharge submission request.
#[derive(Debug, Deserialize)]
pub struct SubmitRechargeRequest {
    /// Claimed amount in cents.
    pub amount_cents: i64,
    /// How the user says they paid (e.g. `"qr_transfer"`).
    pub method: Option<String>,
}

/// Manual recharge submission response.
#[derive(Debug, Serialize)]
pub struct SubmitRechargeResponse {
    /// Id of the pending claim.
    pub transaction_id: TransactionId,
    /// Claim status (always `pending` here).
    pub status: TxStatus,
}

/// `POST /recharge/manual`
pub async fn submit_manual(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<SubmitRechargeRequest>,
) -> Result<Json<SubmitRechargeResponse>, ApiError> {
    let amount_cents = validate_amount(req.amount_cents)?;
    ratelimit::enforce(
        &state,
        "recharge",
        user.user_id,
        state.config.recharge_limit_per_window,
    )
    .await?;

    let mut claim = Transaction::recharge(user.user_id, amount_cents, PayChannel::Manual);
    if let Some(method) = req.method {
        claim = claim.with_metadata(serde_json::json!({ "method": method }));
    }
    let claim = state.store.create_recharge(claim).await?;

    tracing::info!(
        user_id = %user.user_id,
        transaction_id = %claim.id,
        amount_cents,
        "manual recharge claim submitted"
    );

    Ok(Json(SubmitRechargeResponse {
        transaction_id: claim.id,
        status: claim.status,
    }))
}

/// Admin review response for a recharge claim.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    /// The reviewed claim.
    pub transaction_id: TransactionId,
    /// Claim status after the review.
    pub status: TxStatus,
    /// Balance after the review, present when this call applied it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance_cents: Option<i64>,
    /// Whether the claim had already been reviewed before this call.
    pub already_processed: bool,
}

/// `POST /admin/recharge/{tx_id}/approve`
pub async fn approve(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(tx_id): Path<String>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let id = parse_tx_id(&tx_id)?;

    match state.store.settle_recharge(id).await? {
        SettleOutcome::Applied {
            transaction,
            new_balance_cents,
        } => {
            tracing::info!(
                claimed_admin_id = %admin.admin_id,
                transaction_id = %id,
                user_id = %transaction.user_id,
                amount_cents = transaction.amount_cents,
                new_balance_cents,
                "recharge claim approved"
            );
            state
                .notifier
                .notify(
                    transaction.user_id,
                    &format!(
                        "Your recharge of {} cents was approved. New balance: {} cents.",
                        transaction.amount_cents, new_balance_cents
                    ),
                )
                .await;

            Ok(Json(ReviewResponse {
                transaction_id: id,
                status: transaction.status,
                new_balance_cents: Some(new_balance_cents),
                already_processed: false,
            }))
        }
        SettleOutcome::AlreadyProcessed => already_processed_response(&state, id).await,
    }
}

/// `POST /admin/recharge/{tx_id}/reject`
pub async fn reject(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(tx_id): Path<String>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let id = parse_tx_id(&tx_id)?;

    match state.store.reject_recharge(id).await? {
        SettleOutcome::Applied { transaction, .. } => {
            tracing::info!(
                claimed_admin_id = %admin.admin_id,
                transaction_id = %id,
                user_id = %transaction.user_id,
                "recharge claim rejected"
            );
            state
                .notifier
                .notify(
                    transaction.user_id,
                    &format!(
                        "Your recharge claim of {} cents was rejected.",
                        transaction.amount_cents
                    ),
                )
                .await;

            Ok(Json(ReviewResponse {
                transaction_id: id,
                status: transaction.status,
                new_balance_cents: None,
                already_processed: false,
            }))
        }
        SettleOutcome::AlreadyProcessed => already_processed_response(&state, id).await,
    }
}

/// Admin income grant request.
#[derive(Debug, Deserialize)]
pub struct AddIncomeRequest {
    /// The user to credit.
    pub user_id: UserId,
    /// Amount in cents.
    pub amount_cents: i64,
    /// Why the credit is granted (seller proceeds, promotion, ...).
    pub description: Option<String>,
}

/// Admin income grant response.
#[derive(Debug, Serialize)]
pub struct AddIncomeResponse {
    /// The completed income ledger entry.
    pub transaction_id: TransactionId,
    /// Balance after the credit.
    pub balance_cents: i64,
}

/// `POST /admin/income`
pub async fn add_income(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(req): Json<AddIncomeRequest>,
) -> Result<Json<AddIncomeResponse>, ApiError> {
    let amount_cents = validate_amount(req.amount_cents)?;
    let description = req.description.unwrap_or_else(|| "Income credit".to_string());

    let receipt = state
        .store
        .credit_income(req.user_id, amount_cents, &description)
        .await?;

    tracing::info!(
        claimed_admin_id = %admin.admin_id,
        user_id = %req.user_id,
        transaction_id = %receipt.transaction.id,
        amount_cents,
        "income credited"
    );

    Ok(Json(AddIncomeResponse {
        transaction_id: receipt.transaction.id,
        balance_cents: receipt.new_balance_cents,
    }))
}

fn parse_tx_id(raw: &str) -> Result<TransactionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid transaction id: {raw}")))
}

async fn already_processed_response(
    state: &AppState,
    id: TransactionId,
) -> Result<Json<ReviewResponse>, ApiError> {
    let transaction = state
        .store
        .get_transaction(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("transaction not found: {id}")))?;

    Ok(Json(ReviewResponse {
        transaction_id: id,
        status: transaction.status,
        new_balance_cents: None,
        already_processed: true,
    }))
}
