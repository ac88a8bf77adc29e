//! Client error types.

/// Errors that can occur when using the vidpay client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The balance does not cover the requested debit.
    #[error("insufficient balance: balance={balance_cents}, required={required_cents}")]
    InsufficientBalance {
        /// Current balance in cents.
        balance_cents: i64,
        /// Required amount in cents.
        required_cents: i64,
    },

    /// Too many requests for this operation in the current window.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
