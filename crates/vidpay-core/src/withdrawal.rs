//! Withdrawal request types for vidpay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{UserId, WithdrawalId};

/// A request to move balance out to an external payout account.
///
/// Funds are debited (held) at request time. Approval confirms the
/// payout happened out-of-band and changes nothing else; rejection
/// refunds the hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Unique withdrawal ID (ULID for time-ordering).
    pub id: WithdrawalId,

    /// The user withdrawing funds.
    pub user_id: UserId,

    /// Amount in cents, always positive.
    pub amount_cents: i64,

    /// Where the payout goes (bank/wallet reference, opaque here).
    pub payout_account: String,

    /// Lifecycle state.
    pub status: WithdrawalStatus,

    /// Reviewer-supplied reason when rejected.
    pub reject_reason: Option<String>,

    /// When the withdrawal was requested.
    pub created_at: DateTime<Utc>,

    /// When the withdrawal last changed state.
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Create a new pending withdrawal.
    #[must_use]
    pub fn new(user_id: UserId, amount_cents: i64, payout_account: String) -> Self {
        let now = Utc::now();
        Self {
            id: WithdrawalId::generate(),
            user_id,
            amount_cents,
            payout_account,
            status: WithdrawalStatus::Pending,
            reject_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle state of a withdrawal. `Approved` and `Rejected` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Funds held, awaiting review.
    Pending,

    /// Payout confirmed; funds already left the account at request time.
    Approved,

    /// Review declined; the hold has been refunded.
    Rejected,
}

impl WithdrawalStatus {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse the storage string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_withdrawal_is_pending() {
        let w = Withdrawal::new(UserId::generate(), 3000, "bank:001".into());
        assert_eq!(w.status, WithdrawalStatus::Pending);
        assert!(w.reject_reason.is_none());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        ] {
            assert_eq!(WithdrawalStatus::parse(status.as_str()), Some(status));
        }
    }
}
