//! Vidpay HTTP API service.
//!
//! The settlement subsystem of the Vidmart marketplace:
//!
//! - Balance accounts and the transaction ledger
//! - Manual recharge claims with admin review
//! - Payment gateway webhooks (signature-verified)
//! - Purchases and withdrawals
//!
//! # Authentication
//!
//! 1. **Marketplace JWT tokens** - for end-user requests, validated
//!    against the identity provider's JWKS
//! 2. **Admin API key** - for review endpoints (`X-Admin-Key`)
//! 3. **Gateway signatures** - webhooks authenticate by signature only

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Webhook handlers need async for consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateways;
pub mod handlers;
pub mod notify;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use notify::{LogNotifier, Notifier};
pub use routes::create_router;
pub use state::AppState;
