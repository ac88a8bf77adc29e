//! Balance and ledger handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use vidpay_core::Transaction;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Default page size for ledger listings.
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Maximum page size for ledger listings.
const MAX_PAGE_SIZE: u32 = 200;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current balance in cents.
    pub balance_cents: i64,
    /// Lifetime credits received, in cents.
    pub lifetime_recharged_cents: i64,
    /// Lifetime credits spent, in cents.
    pub lifetime_spent_cents: i64,
}

/// `GET /balance`
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state.store.ensure_account(user.user_id).await?;

    Ok(Json(BalanceResponse {
        balance_cents: account.balance_cents,
        lifetime_recharged_cents: account.lifetime_recharged_cents,
        lifetime_spent_cents: account.lifetime_spent_cents,
    }))
}

/// Ledger listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Page size (default 50, capped at 200).
    pub limit: Option<u32>,
    /// Offset into the newest-first listing.
    pub offset: Option<u32>,
}

/// Ledger listing response.
#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    /// Transactions, newest first.
    pub transactions: Vec<Transaction>,
}

/// `GET /transactions`
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let transactions = state
        .store
        .list_transactions(user.user_id, limit, offset)
        .await?;

    Ok(Json(TransactionsResponse { transactions }))
}
