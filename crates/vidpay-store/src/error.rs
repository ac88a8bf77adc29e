//! Error types for vidpay storage backends.

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error from the relational backend.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored record failed to decode back into its domain type.
    #[error("corrupt {entity} record {id}: {reason}")]
    Corrupt {
        /// Entity kind, e.g. `"transaction"`.
        entity: &'static str,
        /// The record's primary key.
        id: String,
        /// What failed to decode.
        reason: String,
    },

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"withdrawal"`.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// A debit would take the balance below zero.
    #[error("insufficient balance: have {balance_cents} cents, need {required_cents} cents")]
    InsufficientBalance {
        /// Current balance in cents.
        balance_cents: i64,
        /// The debit that was attempted, in cents.
        required_cents: i64,
    },

    /// The backend itself is unusable (e.g. a poisoned lock).
    #[error("store backend unavailable: {0}")]
    Backend(String),
}

impl StoreError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
