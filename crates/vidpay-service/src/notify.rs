//! User notification sink.
//!
//! Settlement events (recharge settled, withdrawal reviewed) notify the
//! affected user through this seam. Delivery transport is external to
//! this service; failures are logged and never affect the settlement
//! outcome that triggered them.

use async_trait::async_trait;

use vidpay_core::UserId;

/// Fire-and-forget notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `content` to `user_id`. Best effort.
    async fn notify(&self, user_id: UserId, content: &str);
}

/// Default notifier that only writes to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, user_id: UserId, content: &str) {
        tracing::info!(user_id = %user_id, content = %content, "user notification");
    }
}
