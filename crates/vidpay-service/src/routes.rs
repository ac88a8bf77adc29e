//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{account, health, purchase, recharge, webhooks, withdrawals};
use crate::state::AppState;

/// Maximum concurrent requests for user and admin endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## User (marketplace JWT auth)
/// - `GET /balance` - Current balance
/// - `GET /transactions` - Ledger history, newest first
/// - `POST /recharge/manual` - Submit a manual recharge claim
/// - `POST /purchase` - Buy a catalog item
/// - `POST /withdrawal/request` - Request a payout
///
/// ## Admin (`X-Admin-Key`)
/// - `POST /admin/recharge/{tx_id}/approve` / `reject`
/// - `POST /admin/withdrawal/{id}/approve` / `reject`
/// - `POST /admin/income` - Credit seller proceeds or grants
///
/// ## Webhooks (signature verification, no other auth)
/// - `POST /webhook/gateway-a`
/// - `POST /webhook/gateway-b`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // User endpoints
        .route("/balance", get(account::get_balance))
        .route("/transactions", get(account::list_transactions))
        .route("/recharge/manual", post(recharge::submit_manual))
        .route("/purchase", post(purchase::purchase))
        .route("/withdrawal/request", post(withdrawals::request))
        // Admin review endpoints
        .route("/admin/recharge/:tx_id/approve", post(recharge::approve))
        .route("/admin/recharge/:tx_id/reject", post(recharge::reject))
        .route("/admin/withdrawal/:id/approve", post(withdrawals::approve))
        .route("/admin/withdrawal/:id/reject", post(withdrawals::reject))
        .route("/admin/income", post(recharge::add_income))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        .merge(api_routes)
        // Webhooks (no concurrency limit - paced by the gateways)
        .route("/webhook/gateway-a", post(webhooks::gateway_a))
        .route("/webhook/gateway-b", post(webhooks::gateway_b))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
