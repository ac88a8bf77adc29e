//! Error types for vidpay core.

use crate::ids::IdError;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur when constructing core domain values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A monetary amount was zero or negative where a positive amount is
    /// required.
    #[error("invalid amount: {0} cents")]
    InvalidAmount(i64),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

/// Validate that an amount is a positive number of cents.
///
/// # Errors
///
/// Returns `CoreError::InvalidAmount` for zero or negative amounts.
pub fn validate_amount(amount_cents: i64) -> Result<i64> {
    if amount_cents <= 0 {
        return Err(CoreError::InvalidAmount(amount_cents));
    }
    Ok(amount_cents)
}
