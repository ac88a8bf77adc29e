//! Application state.

use std::sync::Arc;

use vidpay_store::Store;

use crate::config::ServiceConfig;
use crate::gateways::{GatewayAVerifier, GatewayBVerifier};
use crate::notify::{LogNotifier, Notifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Notification sink for settlement events.
    pub notifier: Arc<dyn Notifier>,

    /// Gateway A verifier (optional).
    pub gateway_a: Option<Arc<GatewayAVerifier>>,

    /// Gateway B verifier (optional).
    pub gateway_b: Option<Arc<GatewayBVerifier>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let gateway_a = config.gateway_a_secret.as_ref().map(|secret| {
            tracing::info!("gateway A integration enabled");
            Arc::new(GatewayAVerifier::new(secret.clone()))
        });
        if gateway_a.is_none() {
            tracing::warn!("gateway A secret not configured - its webhook will reject everything");
        }

        let gateway_b = config
            .gateway_b_webhook_secret
            .as_ref()
            .zip(config.gateway_b_api_key.as_ref())
            .and_then(
                |(secret, api_key)| match GatewayBVerifier::new(secret.clone(), api_key) {
                    Ok(verifier) => {
                        tracing::info!("gateway B integration enabled");
                        Some(Arc::new(verifier))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to build gateway B verifier");
                        None
                    }
                },
            );
        if gateway_b.is_none() {
            tracing::warn!("gateway B not configured - its webhook will reject everything");
        }

        Self {
            store,
            config,
            notifier: Arc::new(LogNotifier),
            gateway_a,
            gateway_b,
        }
    }

    /// Replace the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
