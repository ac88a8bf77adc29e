//! Per-user rate limiting for submission endpoints.
//!
//! Fixed-window counters keyed `"{op}:{user_id}"`, stored alongside the
//! financial data so all service replicas share one view. The window
//! admits up to `limit` calls and resets wholesale when it expires; a
//! burst straddling the boundary can briefly see up to twice the limit,
//! which is acceptable for an abuse brake on human-initiated actions.

use vidpay_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Record one call against `op` for `user_id` and fail with
/// [`ApiError::RateLimited`] if the window's limit is exhausted.
pub async fn enforce(
    state: &AppState,
    op: &str,
    user_id: UserId,
    limit: u32,
) -> Result<(), ApiError> {
    let key = format!("{op}:{user_id}");
    let decision = state
        .store
        .rate_limit_hit(&key, limit, state.config.rate_limit_window())
        .await?;

    if decision.allowed {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user_id,
            op = %op,
            count = decision.count,
            "rate limit exceeded"
        );
        Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        })
    }
}
