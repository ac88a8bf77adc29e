//! Purchase handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use vidpay_core::{validate_amount, LicenseType, OrderId, TransactionId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::ratelimit;
use crate::state::AppState;

/// Purchase request.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Catalog item to buy.
    pub item_id: String,
    /// Price in cents, as quoted by the catalog.
    pub price_cents: i64,
    /// License to grant (defaults to personal).
    pub license_type: Option<LicenseType>,
}

/// Purchase response.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// The created order.
    pub order_id: OrderId,
    /// The debiting ledger entry.
    pub transaction_id: TransactionId,
    /// Balance after the purchase, in cents.
    pub balance_cents: i64,
}

/// `POST /purchase`
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let price_cents = validate_amount(req.price_cents)?;
    if req.item_id.is_empty() {
        return Err(ApiError::BadRequest("item_id must not be empty".into()));
    }
    ratelimit::enforce(
        &state,
        "purchase",
        user.user_id,
        state.config.purchase_limit_per_window,
    )
    .await?;

    let license_type = req.license_type.unwrap_or(LicenseType::Personal);
    let receipt = state
        .store
        .debit_purchase(user.user_id, &req.item_id, price_cents, license_type)
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %receipt.order.id,
        item_id = %req.item_id,
        price_cents,
        balance_cents = receipt.new_balance_cents,
        "purchase completed"
    );

    Ok(Json(PurchaseResponse {
        order_id: receipt.order.id,
        transaction_id: receipt.transaction.id,
        balance_cents: receipt.new_balance_cents,
    }))
}
