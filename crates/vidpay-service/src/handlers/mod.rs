//! HTTP request handlers.

pub mod account;
pub mod health;
pub mod purchase;
pub mod recharge;
pub mod webhooks;
pub mod withdrawals;
