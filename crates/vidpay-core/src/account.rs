//! Balance account types for vidpay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A settlement account for a marketplace user.
///
/// The balance is held as integer cents to avoid floating point
/// precision issues. Accounts are created implicitly on first access and
/// are never deleted.
///
/// The balance is only ever mutated through the store's compound
/// operations, which enforce the non-negative invariant inside the same
/// atomic unit as the accompanying ledger write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The user this account belongs to.
    pub user_id: UserId,

    /// Current balance in cents. Never negative.
    pub balance_cents: i64,

    /// Lifetime credits received from recharges and income (in cents).
    pub lifetime_recharged_cents: i64,

    /// Lifetime credits spent on purchases and withdrawals (in cents).
    pub lifetime_spent_cents: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            balance_cents: 0,
            lifetime_recharged_cents: 0,
            lifetime_spent_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the account can cover a debit of `amount_cents`.
    #[must_use]
    pub fn covers(&self, amount_cents: i64) -> bool {
        self.balance_cents >= amount_cents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_has_zero_balance() {
        let account = Account::new(UserId::generate());
        assert_eq!(account.balance_cents, 0);
        assert_eq!(account.lifetime_recharged_cents, 0);
        assert_eq!(account.lifetime_spent_cents, 0);
    }

    #[test]
    fn covers_is_inclusive() {
        let mut account = Account::new(UserId::generate());
        account.balance_cents = 1000;

        assert!(account.covers(500));
        assert!(account.covers(1000));
        assert!(!account.covers(1001));
    }
}
