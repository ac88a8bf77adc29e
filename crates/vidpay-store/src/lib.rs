//! Storage backends for the vidpay settlement subsystem.
//!
//! The [`Store`] trait is the single seam between the HTTP service and
//! persistence. Every operation that touches a balance is a *compound*
//! operation: the balance mutation, the ledger write and any state
//! transition happen inside one atomic unit, so no caller can observe a
//! half-applied settlement.
//!
//! Two backends are provided:
//!
//! - [`MemStore`]: in-memory, for tests and local development.
//! - [`PgStore`]: `PostgreSQL` via `sqlx`, for production.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod schema;

use std::time::Duration;

use async_trait::async_trait;

use vidpay_core::{
    Account, LicenseType, Order, OrderId, Transaction, TransactionId, UserId, Withdrawal,
    WithdrawalId,
};

pub use error::{Result, StoreError};
pub use memory::MemStore;
pub use postgres::PgStore;

/// Outcome of settling or rejecting a pending recharge claim.
///
/// A claim can be settled at most once. Replayed gateway notifications
/// and repeated admin reviews land on a terminal claim and report
/// `AlreadyProcessed` instead of applying twice.
#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// The claim was pending and has now transitioned; any balance
    /// effect was applied in the same atomic unit.
    Applied {
        /// The claim after the transition.
        transaction: Transaction,
        /// The account balance after the transition, in cents.
        new_balance_cents: i64,
    },

    /// The claim was already in a terminal state. Nothing changed.
    AlreadyProcessed,
}

/// Outcome of reviewing a pending withdrawal.
#[derive(Debug, Clone)]
pub enum WithdrawalOutcome {
    /// The withdrawal was pending and has now transitioned.
    Applied {
        /// The withdrawal after the transition.
        withdrawal: Withdrawal,
        /// The refund ledger entry, present only for rejections.
        refund: Option<Transaction>,
    },

    /// The withdrawal was already in a terminal state. Nothing changed.
    AlreadyProcessed,
}

/// A credit applied to an account together with its ledger entry.
#[derive(Debug, Clone)]
pub struct CreditReceipt {
    /// The completed ledger entry.
    pub transaction: Transaction,
    /// The balance after the credit, in cents.
    pub new_balance_cents: i64,
}

/// A completed purchase: order, ledger entry and resulting balance.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// The immutable order record.
    pub order: Order,
    /// The debiting ledger entry.
    pub transaction: Transaction,
    /// The balance after the debit, in cents.
    pub new_balance_cents: i64,
}

/// A created withdrawal hold and the resulting balance.
#[derive(Debug, Clone)]
pub struct WithdrawalReceipt {
    /// The pending withdrawal.
    pub withdrawal: Withdrawal,
    /// The balance after the hold, in cents.
    pub new_balance_cents: i64,
}

/// Verdict of one fixed-window rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    /// Whether the call is within the limit.
    pub allowed: bool,
    /// Number of calls recorded in the current window, including this
    /// one.
    pub count: u32,
    /// Seconds until the window resets. Zero when allowed.
    pub retry_after_secs: u64,
}

/// Persistence seam for the settlement subsystem.
///
/// Implementations must make each method atomic: concurrent calls may
/// interleave between methods but never inside one.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the account for `user_id`, creating it with a zero balance
    /// if it does not exist yet.
    async fn ensure_account(&self, user_id: UserId) -> Result<Account>;

    /// Fetch the account for `user_id` if it exists.
    async fn get_account(&self, user_id: UserId) -> Result<Option<Account>>;

    /// Credit `amount_cents` to `user_id` with a completed income ledger
    /// entry, creating the account if needed.
    async fn credit_income(
        &self,
        user_id: UserId,
        amount_cents: i64,
        description: &str,
    ) -> Result<CreditReceipt>;

    /// Persist a pending recharge claim. The claim credits nothing until
    /// it is settled.
    async fn create_recharge(&self, transaction: Transaction) -> Result<Transaction>;

    /// Fetch a ledger transaction by id.
    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>>;

    /// List a user's ledger transactions, newest first.
    async fn list_transactions(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>>;

    /// Transition a pending recharge claim to completed and credit its
    /// amount, atomically.
    async fn settle_recharge(&self, id: TransactionId) -> Result<SettleOutcome>;

    /// Transition a pending recharge claim to rejected. No balance
    /// effect.
    async fn reject_recharge(&self, id: TransactionId) -> Result<SettleOutcome>;

    /// Debit `price_cents` from the buyer and record the order plus its
    /// ledger entry, atomically. Fails with
    /// [`StoreError::InsufficientBalance`] without any partial effect.
    async fn debit_purchase(
        &self,
        user_id: UserId,
        item_id: &str,
        price_cents: i64,
        license_type: LicenseType,
    ) -> Result<PurchaseReceipt>;

    /// Fetch an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Hold `amount_cents` from the user's balance and record a pending
    /// withdrawal, atomically. Fails with
    /// [`StoreError::InsufficientBalance`] without any partial effect.
    async fn request_withdrawal(
        &self,
        user_id: UserId,
        amount_cents: i64,
        payout_account: &str,
    ) -> Result<WithdrawalReceipt>;

    /// Fetch a withdrawal by id.
    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<Withdrawal>>;

    /// Mark a pending withdrawal approved. The funds already left the
    /// account at request time, so the balance is untouched.
    async fn approve_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalOutcome>;

    /// Mark a pending withdrawal rejected and refund the held amount
    /// with a completed refund ledger entry, atomically.
    async fn reject_withdrawal(&self, id: WithdrawalId, reason: &str)
        -> Result<WithdrawalOutcome>;

    /// Record one hit against the fixed window for `key` and decide
    /// whether it is within `limit` calls per `window`.
    async fn rate_limit_hit(&self, key: &str, limit: u32, window: Duration)
        -> Result<RateDecision>;
}
