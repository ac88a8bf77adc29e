//! API error types and responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Insufficient balance for a debit.
    #[error("insufficient balance: balance={balance_cents}, required={required_cents}")]
    InsufficientBalance {
        /// Current balance in cents.
        balance_cents: i64,
        /// Required amount in cents.
        required_cents: i64,
    },

    /// Too many requests in the current rate-limit window.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the window resets.
        retry_after_secs: u64,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::InsufficientBalance {
                balance_cents,
                required_cents,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_balance",
                self.to_string(),
                Some(serde_json::json!({
                    "balance_cents": balance_cents,
                    "required_cents": required_cents
                })),
            ),
            Self::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
                Some(serde_json::json!({ "retry_after_secs": retry_after_secs })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let retry_after = match &self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<vidpay_store::StoreError> for ApiError {
    fn from(err: vidpay_store::StoreError) -> Self {
        match err {
            vidpay_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            vidpay_store::StoreError::InsufficientBalance {
                balance_cents,
                required_cents,
            } => Self::InsufficientBalance {
                balance_cents,
                required_cents,
            },
            vidpay_store::StoreError::Database(err) => Self::Internal(err.to_string()),
            vidpay_store::StoreError::Corrupt { .. } | vidpay_store::StoreError::Backend(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<vidpay_core::CoreError> for ApiError {
    fn from(err: vidpay_core::CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
