//! Ledger transaction types for vidpay.
//!
//! Every balance change is backed by a transaction record. A transaction
//! carries two orthogonal classifications: its `origin` (what kind of
//! money movement it is) and its `status` (where it sits in its
//! lifecycle). Only `Pending` transactions may transition; `Completed`
//! and `Rejected` are terminal and immutable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// A ledger transaction representing one money movement.
///
/// The id is a ULID and doubles as the merchant-order-id handed to
/// payment gateways, which makes it the idempotency key for their
/// notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance is affected.
    pub user_id: UserId,

    /// Amount in cents, always positive; the direction of the movement
    /// is given by the origin.
    pub amount_cents: i64,

    /// What kind of money movement this is.
    pub origin: TxOrigin,

    /// Lifecycle state.
    pub status: TxStatus,

    /// The payment channel that initiated a recharge. `Manual` for
    /// internally originated transactions.
    pub channel: PayChannel,

    /// Human-readable description.
    pub description: String,

    /// Additional context (item id, payout reference, gateway fields).
    pub metadata: serde_json::Value,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,

    /// When the transaction last changed state.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a pending recharge claim.
    ///
    /// The claim credits nothing until it is settled, either by an admin
    /// approval or by a verified gateway notification.
    #[must_use]
    pub fn recharge(user_id: UserId, amount_cents: i64, channel: PayChannel) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            amount_cents,
            origin: TxOrigin::Recharge,
            status: TxStatus::Pending,
            channel,
            description: format!("Recharge via {channel}"),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a completed purchase debit.
    #[must_use]
    pub fn purchase(user_id: UserId, amount_cents: i64, item_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            amount_cents,
            origin: TxOrigin::Purchase,
            status: TxStatus::Completed,
            channel: PayChannel::Manual,
            description: format!("Purchase of item {item_id}"),
            metadata: serde_json::json!({ "item_id": item_id }),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a completed income credit (seller proceeds, promotional
    /// grants).
    #[must_use]
    pub fn income(user_id: UserId, amount_cents: i64, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            amount_cents,
            origin: TxOrigin::Income,
            status: TxStatus::Completed,
            channel: PayChannel::Manual,
            description,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a completed refund credit for a rejected withdrawal.
    #[must_use]
    pub fn refund(user_id: UserId, amount_cents: i64, reason: String) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::generate(),
            user_id,
            amount_cents,
            origin: TxOrigin::Refund,
            status: TxStatus::Completed,
            channel: PayChannel::Manual,
            description: reason,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set metadata on the transaction.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// What kind of money movement a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOrigin {
    /// User funds their balance (manual claim or gateway payment).
    Recharge,

    /// User buys a catalog item; debits the balance.
    Purchase,

    /// Marketplace credits the user (seller proceeds, grants).
    Income,

    /// Funds returned after a rejected withdrawal.
    Refund,
}

impl TxOrigin {
    /// Whether this origin credits the balance when completed.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Recharge | Self::Income | Self::Refund)
    }

    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recharge => "recharge",
            Self::Purchase => "purchase",
            Self::Income => "income",
            Self::Refund => "refund",
        }
    }

    /// Parse the storage string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recharge" => Some(Self::Recharge),
            "purchase" => Some(Self::Purchase),
            "income" => Some(Self::Income),
            "refund" => Some(Self::Refund),
            _ => None,
        }
    }
}

/// Lifecycle state of a transaction.
///
/// Transitions form a fixed state machine: `Pending -> Completed` and
/// `Pending -> Rejected`. Anything already terminal stays terminal; a
/// repeated transition attempt is reported as already processed, never
/// applied twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Awaiting settlement (recharge claims only).
    Pending,

    /// Settled; the balance effect has been applied.
    Completed,

    /// Rejected by review; no balance effect.
    Rejected,
}

impl TxStatus {
    /// Whether a transition away from this status is allowed.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the storage string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The closed set of payment channels that can originate a recharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayChannel {
    /// QR-code claim reviewed by a human admin.
    Manual,

    /// Gateway A: form-encoded notifications signed in the body.
    GatewayA,

    /// Gateway B: JSON notifications with signature headers and an
    /// encrypted payload.
    GatewayB,
}

impl PayChannel {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::GatewayA => "gateway_a",
            Self::GatewayB => "gateway_b",
        }
    }

    /// Parse the storage string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "gateway_a" => Some(Self::GatewayA),
            "gateway_b" => Some(Self::GatewayB),
            _ => None,
        }
    }
}

impl std::fmt::Display for PayChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
