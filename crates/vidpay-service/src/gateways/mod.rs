//! Payment gateway notification verifiers.
//!
//! The set of supported gateways is closed: each one gets a dedicated
//! verifier type and a dedicated webhook route. Verifiers only prove
//! that a notification is authentic and extract its payment facts; the
//! settlement itself goes through the store's idempotent
//! `settle_recharge`.

pub mod gateway_a;
pub mod gateway_b;

pub use gateway_a::GatewayAVerifier;
pub use gateway_b::{GatewayBError, GatewayBVerifier, PaymentResource};
