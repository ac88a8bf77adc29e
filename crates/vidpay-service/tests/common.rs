//! Shared test harness for integration tests.
//!
//! Runs the full router against an in-memory store. Users authenticate
//! with `test-token:` bearer tokens (enabled by the `test-auth`
//! feature), admins with a fixed key.

#![allow(dead_code)] // Each integration test binary uses a subset.

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::json;

use vidpay_core::UserId;
use vidpay_service::{create_router, AppState, ServiceConfig};
use vidpay_store::MemStore;

/// Admin key configured for the test service.
pub const ADMIN_KEY: &str = "test-admin-key";

/// Gateway A shared secret configured for the test service.
pub const GATEWAY_A_SECRET: &str = "gw-a-secret";

/// Gateway B webhook secret configured for the test service.
pub const GATEWAY_B_SECRET: &str = "gw-b-hook-secret";

/// Gateway B API key bytes (AES-256-GCM).
pub const GATEWAY_B_KEY: [u8; 32] = [9u8; 32];

/// Base64 form of [`GATEWAY_B_KEY`].
pub fn gateway_b_key_b64() -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(GATEWAY_B_KEY)
}

/// A running test service plus direct store access for seeding.
pub struct TestHarness {
    /// The in-process HTTP server.
    pub server: TestServer,
    /// The backing store, for seeding state the API cannot create.
    pub store: Arc<MemStore>,
    /// A fresh user for the test.
    pub user_id: UserId,
}

impl TestHarness {
    /// Start a service instance on a fresh in-memory store.
    pub fn new() -> Self {
        let store = Arc::new(MemStore::new());
        let config = ServiceConfig {
            admin_api_key: Some(ADMIN_KEY.to_string()),
            gateway_a_secret: Some(GATEWAY_A_SECRET.to_string()),
            gateway_b_webhook_secret: Some(GATEWAY_B_SECRET.to_string()),
            gateway_b_api_key: Some(gateway_b_key_b64()),
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone(), config);
        let server = TestServer::new(create_router(state)).expect("failed to start test server");

        Self {
            server,
            store,
            user_id: UserId::generate(),
        }
    }

    /// Bearer token header value for the harness user.
    pub fn auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.user_id)
    }

    /// Bearer token header value for an arbitrary user.
    pub fn auth_header_for(&self, user_id: UserId) -> String {
        format!("Bearer test-token:{user_id}")
    }

    /// Credit the harness user through the admin income endpoint.
    pub async fn fund(&self, amount_cents: i64) {
        self.server
            .post("/admin/income")
            .add_header("x-admin-key", ADMIN_KEY)
            .json(&json!({
                "user_id": self.user_id.to_string(),
                "amount_cents": amount_cents,
                "description": "Test funding"
            }))
            .await
            .assert_status_ok();
    }

    /// Read the harness user's current balance.
    pub async fn balance(&self) -> i64 {
        let response = self
            .server
            .get("/balance")
            .add_header("authorization", self.auth_header())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["balance_cents"].as_i64().expect("balance_cents")
    }
}
