//! In-memory store for tests and local development.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;

use vidpay_core::{
    Account, LicenseType, Order, OrderId, Transaction, TransactionId, TxStatus, UserId,
    Withdrawal, WithdrawalId, WithdrawalStatus,
};

use crate::error::{Result, StoreError};
use crate::{
    CreditReceipt, PurchaseReceipt, RateDecision, SettleOutcome, Store, WithdrawalOutcome,
    WithdrawalReceipt,
};

#[derive(Debug)]
struct Window {
    count: u32,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<UserId, Account>,
    // BTreeMap keyed by ULID keeps the ledger chronologically ordered.
    transactions: BTreeMap<TransactionId, Transaction>,
    orders: HashMap<OrderId, Order>,
    withdrawals: BTreeMap<WithdrawalId, Withdrawal>,
    windows: HashMap<String, Window>,
}

impl Inner {
    fn account_mut(&mut self, user_id: UserId) -> &mut Account {
        self.accounts
            .entry(user_id)
            .or_insert_with(|| Account::new(user_id))
    }

    fn credit(&mut self, user_id: UserId, amount_cents: i64) -> i64 {
        let account = self.account_mut(user_id);
        account.balance_cents += amount_cents;
        account.lifetime_recharged_cents += amount_cents;
        account.updated_at = Utc::now();
        account.balance_cents
    }

    fn debit(&mut self, user_id: UserId, amount_cents: i64) -> Result<i64> {
        let account = self.account_mut(user_id);
        if !account.covers(amount_cents) {
            return Err(StoreError::InsufficientBalance {
                balance_cents: account.balance_cents,
                required_cents: amount_cents,
            });
        }
        account.balance_cents -= amount_cents;
        account.lifetime_spent_cents += amount_cents;
        account.updated_at = Utc::now();
        Ok(account.balance_cents)
    }

    fn refund(&mut self, user_id: UserId, amount_cents: i64) -> i64 {
        let account = self.account_mut(user_id);
        account.balance_cents += amount_cents;
        account.lifetime_spent_cents -= amount_cents;
        account.updated_at = Utc::now();
        account.balance_cents
    }
}

/// In-memory [`Store`] implementation.
///
/// All state sits behind a single mutex, which is held for the whole of
/// each compound operation. That makes every method trivially atomic at
/// the cost of serializing all access, which is fine for its intended
/// use in tests and single-process development.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store mutex poisoned".into()))
    }
}

#[async_trait]
impl Store for MemStore {
    async fn ensure_account(&self, user_id: UserId) -> Result<Account> {
        let mut inner = self.lock()?;
        Ok(inner.account_mut(user_id).clone())
    }

    async fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let inner = self.lock()?;
        Ok(inner.accounts.get(&user_id).cloned())
    }

    async fn credit_income(
        &self,
        user_id: UserId,
        amount_cents: i64,
        description: &str,
    ) -> Result<CreditReceipt> {
        let mut inner = self.lock()?;
        let transaction = Transaction::income(user_id, amount_cents, description.to_owned());
        let new_balance_cents = inner.credit(user_id, amount_cents);
        inner.transactions.insert(transaction.id, transaction.clone());
        Ok(CreditReceipt {
            transaction,
            new_balance_cents,
        })
    }

    async fn create_recharge(&self, transaction: Transaction) -> Result<Transaction> {
        let mut inner = self.lock()?;
        inner.account_mut(transaction.user_id);
        inner.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let inner = self.lock()?;
        Ok(inner.transactions.get(&id).cloned())
    }

    async fn list_transactions(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>> {
        let inner = self.lock()?;
        Ok(inner
            .transactions
            .values()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn settle_recharge(&self, id: TransactionId) -> Result<SettleOutcome> {
        let mut inner = self.lock()?;
        let Some(tx) = inner.transactions.get(&id) else {
            return Err(StoreError::not_found("transaction", id));
        };
        if !tx.status.is_pending() {
            return Ok(SettleOutcome::AlreadyProcessed);
        }
        let (user_id, amount_cents) = (tx.user_id, tx.amount_cents);
        let new_balance_cents = inner.credit(user_id, amount_cents);
        let tx = inner
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("transaction", id))?;
        tx.status = TxStatus::Completed;
        tx.updated_at = Utc::now();
        Ok(SettleOutcome::Applied {
            transaction: tx.clone(),
            new_balance_cents,
        })
    }

    async fn reject_recharge(&self, id: TransactionId) -> Result<SettleOutcome> {
        let mut inner = self.lock()?;
        let Some(tx) = inner.transactions.get_mut(&id) else {
            return Err(StoreError::not_found("transaction", id));
        };
        if !tx.status.is_pending() {
            return Ok(SettleOutcome::AlreadyProcessed);
        }
        tx.status = TxStatus::Rejected;
        tx.updated_at = Utc::now();
        let transaction = tx.clone();
        let new_balance_cents = inner.account_mut(transaction.user_id).balance_cents;
        Ok(SettleOutcome::Applied {
            transaction,
            new_balance_cents,
        })
    }

    async fn debit_purchase(
        &self,
        user_id: UserId,
        item_id: &str,
        price_cents: i64,
        license_type: LicenseType,
    ) -> Result<PurchaseReceipt> {
        let mut inner = self.lock()?;
        let new_balance_cents = inner.debit(user_id, price_cents)?;
        let order = Order::new(user_id, item_id.to_owned(), price_cents, license_type);
        let transaction = Transaction::purchase(user_id, price_cents, item_id)
            .with_metadata(serde_json::json!({ "item_id": item_id, "order_id": order.id }));
        inner.orders.insert(order.id, order.clone());
        inner.transactions.insert(transaction.id, transaction.clone());
        Ok(PurchaseReceipt {
            order,
            transaction,
            new_balance_cents,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let inner = self.lock()?;
        Ok(inner.orders.get(&id).cloned())
    }

    async fn request_withdrawal(
        &self,
        user_id: UserId,
        amount_cents: i64,
        payout_account: &str,
    ) -> Result<WithdrawalReceipt> {
        let mut inner = self.lock()?;
        let new_balance_cents = inner.debit(user_id, amount_cents)?;
        let withdrawal = Withdrawal::new(user_id, amount_cents, payout_account.to_owned());
        inner.withdrawals.insert(withdrawal.id, withdrawal.clone());
        Ok(WithdrawalReceipt {
            withdrawal,
            new_balance_cents,
        })
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<Withdrawal>> {
        let inner = self.lock()?;
        Ok(inner.withdrawals.get(&id).cloned())
    }

    async fn approve_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalOutcome> {
        let mut inner = self.lock()?;
        let Some(w) = inner.withdrawals.get_mut(&id) else {
            return Err(StoreError::not_found("withdrawal", id));
        };
        if w.status != WithdrawalStatus::Pending {
            return Ok(WithdrawalOutcome::AlreadyProcessed);
        }
        w.status = WithdrawalStatus::Approved;
        w.updated_at = Utc::now();
        Ok(WithdrawalOutcome::Applied {
            withdrawal: w.clone(),
            refund: None,
        })
    }

    async fn reject_withdrawal(
        &self,
        id: WithdrawalId,
        reason: &str,
    ) -> Result<WithdrawalOutcome> {
        let mut inner = self.lock()?;
        let Some(w) = inner.withdrawals.get_mut(&id) else {
            return Err(StoreError::not_found("withdrawal", id));
        };
        if w.status != WithdrawalStatus::Pending {
            return Ok(WithdrawalOutcome::AlreadyProcessed);
        }
        w.status = WithdrawalStatus::Rejected;
        w.reject_reason = Some(reason.to_owned());
        w.updated_at = Utc::now();
        let withdrawal = w.clone();

        inner.refund(withdrawal.user_id, withdrawal.amount_cents);
        let refund = Transaction::refund(
            withdrawal.user_id,
            withdrawal.amount_cents,
            format!("Refund for rejected withdrawal: {reason}"),
        )
        .with_metadata(serde_json::json!({ "withdrawal_id": withdrawal.id }));
        inner.transactions.insert(refund.id, refund.clone());

        Ok(WithdrawalOutcome::Applied {
            withdrawal,
            refund: Some(refund),
        })
    }

    async fn rate_limit_hit(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<RateDecision> {
        let mut inner = self.lock()?;
        let now = Instant::now();
        let entry = inner
            .windows
            .entry(key.to_owned())
            .and_modify(|w| {
                if w.expires_at <= now {
                    w.count = 0;
                    w.expires_at = now + window;
                }
            })
            .or_insert_with(|| Window {
                count: 0,
                expires_at: now + window,
            });
        entry.count += 1;
        let allowed = entry.count <= limit;
        let retry_after_secs = if allowed {
            0
        } else {
            let remaining = entry.expires_at.saturating_duration_since(now);
            // Round up so Retry-After never tells the caller to come
            // back inside the same window.
            u64::from(remaining.subsec_nanos() > 0) + remaining.as_secs()
        };
        Ok(RateDecision {
            allowed,
            count: entry.count,
            retry_after_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vidpay_core::PayChannel;

    use super::*;

    #[tokio::test]
    async fn accounts_are_created_on_first_access() {
        let store = MemStore::new();
        let user = UserId::generate();

        assert!(store.get_account(user).await.unwrap().is_none());
        let account = store.ensure_account(user).await.unwrap();
        assert_eq!(account.balance_cents, 0);
        assert!(store.get_account(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn settle_credits_once_then_reports_already_processed() {
        let store = MemStore::new();
        let user = UserId::generate();
        let claim = store
            .create_recharge(Transaction::recharge(user, 5000, PayChannel::Manual))
            .await
            .unwrap();

        match store.settle_recharge(claim.id).await.unwrap() {
            SettleOutcome::Applied {
                new_balance_cents, ..
            } => assert_eq!(new_balance_cents, 5000),
            SettleOutcome::AlreadyProcessed => panic!("first settle must apply"),
        }

        assert!(matches!(
            store.settle_recharge(claim.id).await.unwrap(),
            SettleOutcome::AlreadyProcessed
        ));
        assert!(matches!(
            store.reject_recharge(claim.id).await.unwrap(),
            SettleOutcome::AlreadyProcessed
        ));

        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 5000);
    }

    #[tokio::test]
    async fn settle_unknown_claim_is_not_found() {
        let store = MemStore::new();
        let err = store
            .settle_recharge(TransactionId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_settles_apply_exactly_once() {
        let store = Arc::new(MemStore::new());
        let user = UserId::generate();
        let claim = store
            .create_recharge(Transaction::recharge(user, 1000, PayChannel::GatewayA))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            let id = claim.id;
            handles.push(tokio::spawn(async move {
                store.settle_recharge(id).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), SettleOutcome::Applied { .. }) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);

        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 1000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_never_overdraw() {
        let store = Arc::new(MemStore::new());
        let user = UserId::generate();
        store.credit_income(user, 1000, "seed").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .debit_purchase(user, &format!("vid_{i}"), 400, LicenseType::Personal)
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(StoreError::InsufficientBalance { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        // 1000 cents covers exactly two 400-cent purchases.
        assert_eq!(succeeded, 2);
        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 200);
    }

    #[tokio::test]
    async fn purchase_writes_order_and_ledger_entry_together() {
        let store = MemStore::new();
        let user = UserId::generate();
        store.credit_income(user, 5000, "seed").await.unwrap();

        let receipt = store
            .debit_purchase(user, "vid_9", 1500, LicenseType::Commercial)
            .await
            .unwrap();
        assert_eq!(receipt.new_balance_cents, 3500);
        assert!(store.get_order(receipt.order.id).await.unwrap().is_some());
        assert!(store
            .get_transaction(receipt.transaction.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn failed_purchase_leaves_no_trace() {
        let store = MemStore::new();
        let user = UserId::generate();
        store.credit_income(user, 100, "seed").await.unwrap();

        let err = store
            .debit_purchase(user, "vid_1", 500, LicenseType::Personal)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientBalance {
                balance_cents: 100,
                required_cents: 500
            }
        ));

        // Only the seed income entry exists.
        let txs = store.list_transactions(user, 10, 0).await.unwrap();
        assert_eq!(txs.len(), 1);
        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 100);
    }

    #[tokio::test]
    async fn rejected_withdrawal_refunds_the_hold() {
        let store = MemStore::new();
        let user = UserId::generate();
        store.credit_income(user, 8000, "seed").await.unwrap();

        let receipt = store
            .request_withdrawal(user, 3000, "bank:777")
            .await
            .unwrap();
        assert_eq!(receipt.new_balance_cents, 5000);

        let outcome = store
            .reject_withdrawal(receipt.withdrawal.id, "payout account mismatch")
            .await
            .unwrap();
        let WithdrawalOutcome::Applied { withdrawal, refund } = outcome else {
            panic!("first review must apply");
        };
        assert_eq!(withdrawal.status, WithdrawalStatus::Rejected);
        let refund = refund.expect("rejection must produce a refund entry");
        assert_eq!(refund.amount_cents, 3000);

        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 8000);

        // The review is terminal; a second attempt changes nothing.
        assert!(matches!(
            store.approve_withdrawal(withdrawal.id).await.unwrap(),
            WithdrawalOutcome::AlreadyProcessed
        ));
        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 8000);
    }

    #[tokio::test]
    async fn approved_withdrawal_keeps_funds_out() {
        let store = MemStore::new();
        let user = UserId::generate();
        store.credit_income(user, 4000, "seed").await.unwrap();

        let receipt = store
            .request_withdrawal(user, 4000, "bank:001")
            .await
            .unwrap();
        assert_eq!(receipt.new_balance_cents, 0);

        let outcome = store
            .approve_withdrawal(receipt.withdrawal.id)
            .await
            .unwrap();
        let WithdrawalOutcome::Applied { withdrawal, refund } = outcome else {
            panic!("first review must apply");
        };
        assert_eq!(withdrawal.status, WithdrawalStatus::Approved);
        assert!(refund.is_none());

        let account = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(account.balance_cents, 0);
    }

    #[tokio::test]
    async fn withdrawal_request_requires_full_cover() {
        let store = MemStore::new();
        let user = UserId::generate();
        store.credit_income(user, 999, "seed").await.unwrap();

        let err = store
            .request_withdrawal(user, 1000, "bank:001")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientBalance { .. }));
    }

    #[tokio::test]
    async fn ledger_lists_newest_first_with_paging() {
        let store = MemStore::new();
        let user = UserId::generate();
        let other = UserId::generate();
        for i in 1..=5 {
            store
                .credit_income(user, i * 100, &format!("batch {i}"))
                .await
                .unwrap();
        }
        store.credit_income(other, 1, "noise").await.unwrap();

        let page = store.list_transactions(user, 2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].amount_cents, 500);
        assert_eq!(page[1].amount_cents, 400);

        let page = store.list_transactions(user, 2, 4).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].amount_cents, 100);
    }

    #[tokio::test]
    async fn rate_limit_counts_within_window() {
        let store = MemStore::new();
        let window = Duration::from_secs(60);

        for i in 1..=3 {
            let d = store.rate_limit_hit("purchase:u1", 3, window).await.unwrap();
            assert!(d.allowed);
            assert_eq!(d.count, i);
            assert_eq!(d.retry_after_secs, 0);
        }

        let d = store.rate_limit_hit("purchase:u1", 3, window).await.unwrap();
        assert!(!d.allowed);
        assert_eq!(d.count, 4);
        assert!(d.retry_after_secs >= 1);

        // Other keys are independent windows.
        let d = store.rate_limit_hit("purchase:u2", 3, window).await.unwrap();
        assert!(d.allowed);
    }

    #[tokio::test]
    async fn rate_limit_window_resets_after_expiry() {
        let store = MemStore::new();
        let window = Duration::from_millis(50);

        let d = store.rate_limit_hit("recharge:u1", 1, window).await.unwrap();
        assert!(d.allowed);
        let d = store.rate_limit_hit("recharge:u1", 1, window).await.unwrap();
        assert!(!d.allowed);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let d = store.rate_limit_hit("recharge:u1", 1, window).await.unwrap();
        assert!(d.allowed);
        assert_eq!(d.count, 1);
    }
}
