//! Request and response types for the vidpay API.

use serde::{Deserialize, Serialize};

use vidpay_core::{LicenseType, Transaction, TxStatus, WithdrawalStatus};

/// Balance summary for the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Spendable balance in cents.
    pub balance_cents: i64,
    /// Total ever credited through recharges, income, and refunds.
    pub lifetime_recharged_cents: i64,
    /// Total ever debited through purchases and withdrawals.
    pub lifetime_spent_cents: i64,
}

/// One page of the user's ledger, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionsResponse {
    /// The transactions on this page.
    pub transactions: Vec<Transaction>,
}

/// Manual recharge claim submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRechargeRequest {
    /// Claimed amount in cents.
    pub amount_cents: i64,
    /// How the user says they paid (e.g. `"qr_transfer"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// Response to a manual recharge claim.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRechargeResponse {
    /// Id of the pending claim; quote this when paying.
    pub transaction_id: String,
    /// Claim status (always `pending` here).
    pub status: TxStatus,
}

/// Purchase request for a catalog item.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    /// The catalog item to buy.
    pub item_id: String,
    /// Price in cents.
    pub price_cents: i64,
    /// License granted by the purchase; defaults to personal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<LicenseType>,
}

/// Response to a successful purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseResponse {
    /// The created order.
    pub order_id: String,
    /// The ledger entry for the debit.
    pub transaction_id: String,
    /// Balance after the debit.
    pub balance_cents: i64,
}

/// Withdrawal request for part of the balance.
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest {
    /// Amount to withdraw in cents.
    pub amount_cents: i64,
    /// Where to pay the funds out.
    pub payout_account: String,
}

/// Response to a withdrawal request.
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalResponse {
    /// Id of the pending withdrawal.
    pub withdrawal_id: String,
    /// Withdrawal status (always `pending` here).
    pub status: WithdrawalStatus,
    /// Balance after the hold.
    pub balance_cents: i64,
}
