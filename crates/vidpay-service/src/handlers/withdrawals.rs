//! Withdrawal request and admin review handlers.
//!
//! Funds are held at request time: the balance is debited immediately,
//! so a pending withdrawal can never be double-spent. Approval confirms
//! the payout happened out-of-band; rejection refunds the hold.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vidpay_core::{validate_amount, WithdrawalId, WithdrawalStatus};
use vidpay_store::WithdrawalOutcome;

use crate::auth::{AdminAuth, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Withdrawal request body.
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    /// Amount to withdraw, in cents.
    pub amount_cents: i64,
    /// External payout account reference.
    pub payout_account: String,
}

/// Withdrawal request response.
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    /// Id of the pending withdrawal.
    pub withdrawal_id: WithdrawalId,
    /// Withdrawal status (always `pending` here).
    pub status: WithdrawalStatus,
    /// Balance after the hold, in cents.
    pub balance_cents: i64,
}

/// `POST /withdrawal/request`
pub async fn request(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<WithdrawalRequest>,
) -> Result<Json<WithdrawalResponse>, ApiError> {
    let amount_cents = validate_amount(req.amount_cents)?;
    if req.payout_account.is_empty() {
        return Err(ApiError::BadRequest(
            "payout_account must not be empty".into(),
        ));
    }

    let receipt = state
        .store
        .request_withdrawal(user.user_id, amount_cents, &req.payout_account)
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        withdrawal_id = %receipt.withdrawal.id,
        amount_cents,
        balance_cents = receipt.new_balance_cents,
        "withdrawal requested"
    );

    Ok(Json(WithdrawalResponse {
        withdrawal_id: receipt.withdrawal.id,
        status: receipt.withdrawal.status,
        balance_cents: receipt.new_balance_cents,
    }))
}

/// Admin review response for a withdrawal.
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    /// The reviewed withdrawal.
    pub withdrawal_id: WithdrawalId,
    /// Withdrawal status after the review.
    pub status: WithdrawalStatus,
    /// Refunded amount in cents, present when this call rejected the
    /// withdrawal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunded_cents: Option<i64>,
    /// Whether the withdrawal had already been reviewed.
    pub already_processed: bool,
}

/// `POST /admin/withdrawal/{id}/approve`
pub async fn approve(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let id = parse_withdrawal_id(&id)?;

    match state.store.approve_withdrawal(id).await? {
        WithdrawalOutcome::Applied { withdrawal, .. } => {
            tracing::info!(
                claimed_admin_id = %admin.admin_id,
                withdrawal_id = %id,
                user_id = %withdrawal.user_id,
                amount_cents = withdrawal.amount_cents,
                "withdrawal approved"
            );
            state
                .notifier
                .notify(
                    withdrawal.user_id,
                    &format!(
                        "Your withdrawal of {} cents was approved and paid out.",
                        withdrawal.amount_cents
                    ),
                )
                .await;

            Ok(Json(ReviewResponse {
                withdrawal_id: id,
                status: withdrawal.status,
                refunded_cents: None,
                already_processed: false,
            }))
        }
        WithdrawalOutcome::AlreadyProcessed => already_processed_response(&state, id).await,
    }
}

/// Withdrawal rejection body.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Why the withdrawal is rejected.
    pub reason: String,
}

/// `POST /admin/withdrawal/{id}/reject`
pub async fn reject(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(id): Path<String>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let id = parse_withdrawal_id(&id)?;
    if req.reason.is_empty() {
        return Err(ApiError::BadRequest("reason must not be empty".into()));
    }

    match state.store.reject_withdrawal(id, &req.reason).await? {
        WithdrawalOutcome::Applied { withdrawal, refund } => {
            tracing::info!(
                claimed_admin_id = %admin.admin_id,
                withdrawal_id = %id,
                user_id = %withdrawal.user_id,
                amount_cents = withdrawal.amount_cents,
                reason = %req.reason,
                "withdrawal rejected"
            );
            state
                .notifier
                .notify(
                    withdrawal.user_id,
                    &format!(
                        "Your withdrawal of {} cents was rejected ({}). The amount has been refunded.",
                        withdrawal.amount_cents, req.reason
                    ),
                )
                .await;

            Ok(Json(ReviewResponse {
                withdrawal_id: id,
                status: withdrawal.status,
                refunded_cents: refund.map(|tx| tx.amount_cents),
                already_processed: false,
            }))
        }
        WithdrawalOutcome::AlreadyProcessed => already_processed_response(&state, id).await,
    }
}

fn parse_withdrawal_id(raw: &str) -> Result<WithdrawalId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid withdrawal id: {raw}")))
}

async fn already_processed_response(
    state: &AppState,
    id: WithdrawalId,
) -> Result<Json<ReviewResponse>, ApiError> {
    let withdrawal = state
        .store
        .get_withdrawal(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("withdrawal not found: {id}")))?;

    Ok(Json(ReviewResponse {
        withdrawal_id: id,
        status: withdrawal.status,
        refunded_cents: None,
        already_processed: true,
    }))
}
