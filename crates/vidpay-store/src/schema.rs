//! Relational schema for the `PostgreSQL` backend.

use sqlx::PgPool;

use crate::error::Result;

/// Idempotent DDL. Applied on startup; every statement is guarded with
/// `IF NOT EXISTS` so restarts are safe.
const STATEMENTS: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS accounts (
        user_id                  TEXT PRIMARY KEY,
        balance_cents            BIGINT NOT NULL DEFAULT 0 CHECK (balance_cents >= 0),
        lifetime_recharged_cents BIGINT NOT NULL DEFAULT 0,
        lifetime_spent_cents     BIGINT NOT NULL DEFAULT 0,
        created_at               TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at               TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    r"CREATE TABLE IF NOT EXISTS transactions (
        id            TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL,
        amount_cents  BIGINT NOT NULL CHECK (amount_cents > 0),
        origin        TEXT NOT NULL,
        status        TEXT NOT NULL,
        channel       TEXT NOT NULL,
        description   TEXT NOT NULL DEFAULT '',
        metadata      JSONB,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    // ULID primary keys sort chronologically, so (user_id, id DESC)
    // serves the newest-first ledger listing directly.
    r"CREATE INDEX IF NOT EXISTS idx_transactions_user_id
        ON transactions (user_id, id DESC)",
    r"CREATE TABLE IF NOT EXISTS orders (
        id            TEXT PRIMARY KEY,
        user_id       TEXT NOT NULL,
        item_id       TEXT NOT NULL,
        price_cents   BIGINT NOT NULL CHECK (price_cents > 0),
        license_type  TEXT NOT NULL,
        completed_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    r"CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders (user_id)",
    r"CREATE TABLE IF NOT EXISTS withdrawals (
        id             TEXT PRIMARY KEY,
        user_id        TEXT NOT NULL,
        amount_cents   BIGINT NOT NULL CHECK (amount_cents > 0),
        payout_account TEXT NOT NULL,
        status         TEXT NOT NULL,
        reject_reason  TEXT,
        created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    r"CREATE INDEX IF NOT EXISTS idx_withdrawals_user_id ON withdrawals (user_id)",
    r"CREATE TABLE IF NOT EXISTS rate_limit_counters (
        key               TEXT PRIMARY KEY,
        count             BIGINT NOT NULL,
        window_expires_at TIMESTAMPTZ NOT NULL
    )",
];

/// Apply the schema to `pool`.
pub async fn apply(pool: &PgPool) -> Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
