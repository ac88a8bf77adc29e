//! `PostgreSQL` store backed by `sqlx`.
//!
//! Compound operations run inside a database transaction, and every
//! state transition is a conditional `UPDATE ... WHERE status =
//! 'pending' RETURNING`: under concurrency only one caller gets the
//! row back, the rest observe the terminal state. Debits are guarded
//! the same way with `WHERE balance_cents >= $n`, so the non-negative
//! balance invariant is enforced by the database itself.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{PgConnection, Row};

use vidpay_core::{
    Account, LicenseType, Order, OrderId, PayChannel, Transaction, TransactionId, TxOrigin,
    TxStatus, UserId, Withdrawal, WithdrawalId, WithdrawalStatus,
};

use crate::error::{Result, StoreError};
use crate::{
    schema, CreditReceipt, PurchaseReceipt, RateDecision, SettleOutcome, Store,
    WithdrawalOutcome, WithdrawalReceipt,
};

const TX_COLUMNS: &str =
    "id, user_id, amount_cents, origin, status, channel, description, metadata, created_at, updated_at";

/// `PostgreSQL` [`Store`] implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(url)
            .await?;
        schema::apply(&pool).await?;
        tracing::info!("connected to postgres store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool. The schema must already be applied.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn corrupt(entity: &'static str, id: &str, reason: &str) -> StoreError {
    StoreError::Corrupt {
        entity,
        id: id.to_owned(),
        reason: reason.to_owned(),
    }
}

fn decode_account(row: &PgRow) -> Result<Account> {
    let user_id: String = row.try_get("user_id")?;
    Ok(Account {
        user_id: user_id
            .parse()
            .map_err(|_| corrupt("account", &user_id, "invalid user_id"))?,
        balance_cents: row.try_get("balance_cents")?,
        lifetime_recharged_cents: row.try_get("lifetime_recharged_cents")?,
        lifetime_spent_cents: row.try_get("lifetime_spent_cents")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn decode_transaction(row: &PgRow) -> Result<Transaction> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let origin: String = row.try_get("origin")?;
    let status: String = row.try_get("status")?;
    let channel: String = row.try_get("channel")?;
    let metadata: Option<serde_json::Value> = row.try_get("metadata")?;
    Ok(Transaction {
        user_id: user_id
            .parse()
            .map_err(|_| corrupt("transaction", &id, "invalid user_id"))?,
        amount_cents: row.try_get("amount_cents")?,
        origin: TxOrigin::parse(&origin)
            .ok_or_else(|| corrupt("transaction", &id, "invalid origin"))?,
        status: TxStatus::parse(&status)
            .ok_or_else(|| corrupt("transaction", &id, "invalid status"))?,
        channel: PayChannel::parse(&channel)
            .ok_or_else(|| corrupt("transaction", &id, "invalid channel"))?,
        description: row.try_get("description")?,
        metadata: metadata.unwrap_or(serde_json::Value::Null),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        id: id
            .parse()
            .map_err(|_| corrupt("transaction", &id, "invalid id"))?,
    })
}

fn decode_order(row: &PgRow) -> Result<Order> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let license: String = row.try_get("license_type")?;
    Ok(Order {
        user_id: user_id
            .parse()
            .map_err(|_| corrupt("order", &id, "invalid user_id"))?,
        item_id: row.try_get("item_id")?,
        price_cents: row.try_get("price_cents")?,
        license_type: LicenseType::parse(&license)
            .ok_or_else(|| corrupt("order", &id, "invalid license_type"))?,
        completed_at: row.try_get("completed_at")?,
        id: id.parse().map_err(|_| corrupt("order", &id, "invalid id"))?,
    })
}

fn decode_withdrawal(row: &PgRow) -> Result<Withdrawal> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let status: String = row.try_get("status")?;
    Ok(Withdrawal {
        user_id: user_id
            .parse()
            .map_err(|_| corrupt("withdrawal", &id, "invalid user_id"))?,
        amount_cents: row.try_get("amount_cents")?,
        payout_account: row.try_get("payout_account")?,
        status: WithdrawalStatus::parse(&status)
            .ok_or_else(|| corrupt("withdrawal", &id, "invalid status"))?,
        reject_reason: row.try_get("reject_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        id: id
            .parse()
            .map_err(|_| corrupt("withdrawal", &id, "invalid id"))?,
    })
}

/// Credit an account, creating it on first touch.
async fn credit(conn: &mut PgConnection, user_id: UserId, amount_cents: i64) -> Result<i64> {
    let balance: i64 = sqlx::query_scalar(
        r"INSERT INTO accounts (user_id, balance_cents, lifetime_recharged_cents)
          VALUES ($1, $2, $2)
          ON CONFLICT (user_id) DO UPDATE SET
              balance_cents = accounts.balance_cents + EXCLUDED.balance_cents,
              lifetime_recharged_cents =
                  accounts.lifetime_recharged_cents + EXCLUDED.balance_cents,
              updated_at = now()
          RETURNING balance_cents",
    )
    .bind(user_id.to_string())
    .bind(amount_cents)
    .fetch_one(conn)
    .await?;
    Ok(balance)
}

/// Conditionally debit an account. The `balance_cents >= $2` guard makes
/// overdraw impossible regardless of interleaving.
async fn debit(conn: &mut PgConnection, user_id: UserId, amount_cents: i64) -> Result<i64> {
    let updated: Option<i64> = sqlx::query_scalar(
        r"UPDATE accounts SET
              balance_cents = balance_cents - $2,
              lifetime_spent_cents = lifetime_spent_cents + $2,
              updated_at = now()
          WHERE user_id = $1 AND balance_cents >= $2
          RETURNING balance_cents",
    )
    .bind(user_id.to_string())
    .bind(amount_cents)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(balance) = updated {
        return Ok(balance);
    }
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT balance_cents FROM accounts WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_optional(conn)
            .await?;
    Err(StoreError::InsufficientBalance {
        balance_cents: balance.unwrap_or(0),
        required_cents: amount_cents,
    })
}

async fn insert_transaction(conn: &mut PgConnection, tx: &Transaction) -> Result<()> {
    let metadata = match &tx.metadata {
        serde_json::Value::Null => None,
        other => Some(other.clone()),
    };
    sqlx::query(
        r"INSERT INTO transactions
              (id, user_id, amount_cents, origin, status, channel,
               description, metadata, created_at, updated_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(tx.id.to_string())
    .bind(tx.user_id.to_string())
    .bind(tx.amount_cents)
    .bind(tx.origin.as_str())
    .bind(tx.status.as_str())
    .bind(tx.channel.as_str())
    .bind(&tx.description)
    .bind(metadata)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ensure_account(&self, user_id: UserId) -> Result<Account> {
        sqlx::query("INSERT INTO accounts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT * FROM accounts WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        decode_account(&row)
    }

    async fn get_account(&self, user_id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE user_id = $1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_account).transpose()
    }

    async fn credit_income(
        &self,
        user_id: UserId,
        amount_cents: i64,
        description: &str,
    ) -> Result<CreditReceipt> {
        let transaction = Transaction::income(user_id, amount_cents, description.to_owned());
        let mut db = self.pool.begin().await?;
        let new_balance_cents = credit(&mut db, user_id, amount_cents).await?;
        insert_transaction(&mut db, &transaction).await?;
        db.commit().await?;
        Ok(CreditReceipt {
            transaction,
            new_balance_cents,
        })
    }

    async fn create_recharge(&self, transaction: Transaction) -> Result<Transaction> {
        let mut db = self.pool.begin().await?;
        sqlx::query("INSERT INTO accounts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(transaction.user_id.to_string())
            .execute(&mut *db)
            .await?;
        insert_transaction(&mut db, &transaction).await?;
        db.commit().await?;
        Ok(transaction)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(decode_transaction).transpose()
    }

    async fn list_transactions(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TX_COLUMNS} FROM transactions
             WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(decode_transaction).collect()
    }

    async fn settle_recharge(&self, id: TransactionId) -> Result<SettleOutcome> {
        let mut db = self.pool.begin().await?;
        let row = sqlx::query(&format!(
            "UPDATE transactions SET status = 'completed', updated_at = now()
             WHERE id = $1 AND status = 'pending'
             RETURNING {TX_COLUMNS}"
        ))
        .bind(id.to_string())
        .fetch_optional(&mut *db)
        .await?;

        let Some(row) = row else {
            return terminal_or_missing(&self.pool, id).await;
        };
        let transaction = decode_transaction(&row)?;
        let new_balance_cents =
            credit(&mut db, transaction.user_id, transaction.amount_cents).await?;
        db.commit().await?;
        Ok(SettleOutcome::Applied {
            transaction,
            new_balance_cents,
        })
    }

    async fn reject_recharge(&self, id: TransactionId) -> Result<SettleOutcome> {
        let row = sqlx::query(&format!(
            "UPDATE transactions SET status = 'rejected', updated_at = now()
             WHERE id = $1 AND status = 'pending'
             RETURNING {TX_COLUMNS}"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return terminal_or_missing(&self.pool, id).await;
        };
        let transaction = decode_transaction(&row)?;
        let new_balance_cents: Option<i64> =
            sqlx::query_scalar("SELECT balance_cents FROM accounts WHERE user_id = $1")
                .bind(transaction.user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        Ok(SettleOutcome::Applied {
            transaction,
            new_balance_cents: new_balance_cents.unwrap_or(0),
        })
    }

    async fn debit_purchase(
        &self,
        user_id: UserId,
        item_id: &str,
        price_cents: i64,
        license_type: LicenseType,
    ) -> Result<PurchaseReceipt> {
        let mut db = self.pool.begin().await?;
        let new_balance_cents = debit(&mut db, user_id, price_cents).await?;

        let order = Order::new(user_id, item_id.to_owned(), price_cents, license_type);
        sqlx::query(
            r"INSERT INTO orders (id, user_id, item_id, price_cents, license_type, completed_at)
              VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id.to_string())
        .bind(order.user_id.to_string())
        .bind(&order.item_id)
        .bind(order.price_cents)
        .bind(order.license_type.as_str())
        .bind(order.completed_at)
        .execute(&mut *db)
        .await?;

        let transaction = Transaction::purchase(user_id, price_cents, item_id)
            .with_metadata(serde_json::json!({ "item_id": item_id, "order_id": order.id }));
        insert_transaction(&mut db, &transaction).await?;
        db.commit().await?;

        Ok(PurchaseReceipt {
            order,
            transaction,
            new_balance_cents,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_order).transpose()
    }

    async fn request_withdrawal(
        &self,
        user_id: UserId,
        amount_cents: i64,
        payout_account: &str,
    ) -> Result<WithdrawalReceipt> {
        let mut db = self.pool.begin().await?;
        let new_balance_cents = debit(&mut db, user_id, amount_cents).await?;

        let withdrawal = Withdrawal::new(user_id, amount_cents, payout_account.to_owned());
        sqlx::query(
            r"INSERT INTO withdrawals
                  (id, user_id, amount_cents, payout_account, status, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(withdrawal.id.to_string())
        .bind(withdrawal.user_id.to_string())
        .bind(withdrawal.amount_cents)
        .bind(&withdrawal.payout_account)
        .bind(withdrawal.status.as_str())
        .bind(withdrawal.created_at)
        .bind(withdrawal.updated_at)
        .execute(&mut *db)
        .await?;
        db.commit().await?;

        Ok(WithdrawalReceipt {
            withdrawal,
            new_balance_cents,
        })
    }

    async fn get_withdrawal(&self, id: WithdrawalId) -> Result<Option<Withdrawal>> {
        let row = sqlx::query("SELECT * FROM withdrawals WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_withdrawal).transpose()
    }

    async fn approve_withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalOutcome> {
        let row = sqlx::query(
            r"UPDATE withdrawals SET status = 'approved', updated_at = now()
              WHERE id = $1 AND status = 'pending'
              RETURNING *",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(WithdrawalOutcome::Applied {
                withdrawal: decode_withdrawal(&row)?,
                refund: None,
            }),
            None => withdrawal_terminal_or_missing(&self.pool, id).await,
        }
    }

    async fn reject_withdrawal(
        &self,
        id: WithdrawalId,
        reason: &str,
    ) -> Result<WithdrawalOutcome> {
        let mut db = self.pool.begin().await?;
        let row = sqlx::query(
            r"UPDATE withdrawals
              SET status = 'rejected', reject_reason = $2, updated_at = now()
              WHERE id = $1 AND status = 'pending'
              RETURNING *",
        )
        .bind(id.to_string())
        .bind(reason)
        .fetch_optional(&mut *db)
        .await?;

        let Some(row) = row else {
            return withdrawal_terminal_or_missing(&self.pool, id).await;
        };
        let withdrawal = decode_withdrawal(&row)?;

        // Reverse the hold rather than book new income.
        sqlx::query(
            r"UPDATE accounts SET
                  balance_cents = balance_cents + $2,
                  lifetime_spent_cents = lifetime_spent_cents - $2,
                  updated_at = now()
              WHERE user_id = $1",
        )
        .bind(withdrawal.user_id.to_string())
        .bind(withdrawal.amount_cents)
        .execute(&mut *db)
        .await?;

        let refund = Transaction::refund(
            withdrawal.user_id,
            withdrawal.amount_cents,
            format!("Refund for rejected withdrawal: {reason}"),
        )
        .with_metadata(serde_json::json!({ "withdrawal_id": withdrawal.id }));
        insert_transaction(&mut db, &refund).await?;
        db.commit().await?;

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
        let row = sqlx::query(
            r"INSERT INTO rate_limit_counters (key, count, window_expires_at)
              VALUES ($1, 1, now() + make_interval(secs => $2))
              ON CONFLICT (key) DO UPDATE SET
                  count = CASE WHEN rate_limit_counters.window_expires_at <= now()
                               THEN 1
                               ELSE rate_limit_counters.count + 1 END,
                  window_expires_at = CASE WHEN rate_limit_counters.window_expires_at <= now()
                               THEN now() + make_interval(secs => $2)
                               ELSE rate_limit_counters.window_expires_at END
              RETURNING count,
                  GREATEST(CEIL(EXTRACT(EPOCH FROM (window_expires_at - now()))), 0)::BIGINT
                      AS retry_secs",
        )
        .bind(key)
        .bind(window.as_secs_f64())
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("count")?;
        let retry_secs: i64 = row.try_get("retry_secs")?;
        let allowed = count <= i64::from(limit);
        Ok(RateDecision {
            allowed,
            count: u32::try_from(count).unwrap_or(u32::MAX),
            retry_after_secs: if allowed {
                0
            } else {
                u64::try_from(retry_secs).unwrap_or(0)
            },
        })
    }
}

/// A conditional transition found no pending row: distinguish a replay
/// on a terminal claim from an unknown id.
async fn terminal_or_missing(pool: &PgPool, id: TransactionId) -> Result<SettleOutcome> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM transactions WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
    match status {
        Some(_) => Ok(SettleOutcome::AlreadyProcessed),
        None => Err(StoreError::not_found("transaction", id)),
    }
}

async fn withdrawal_terminal_or_missing(
    pool: &PgPool,
    id: WithdrawalId,
) -> Result<WithdrawalOutcome> {
    let status: Option<String> =
        sqlx::query_scalar("SELECT status FROM withdrawals WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
    match status {
        Some(_) => Ok(WithdrawalOutcome::AlreadyProcessed),
        None => Err(StoreError::not_found("withdrawal", id)),
    }
}
