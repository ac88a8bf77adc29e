//! Vidpay Client SDK.
//!
//! This crate provides a client library for services to interact with the vidpay API.
//!
//! # Example
//!
//! ```no_run
//! use vidpay_client::{PurchaseRequest, VidpayClient};
//!
//! # async fn example() -> Result<(), vidpay_client::ClientError> {
//! let client = VidpayClient::new(
//!     "http://vidpay.marketplace.svc:8086",
//!     "user-bearer-token",
//! )?;
//!
//! // Buy a catalog item
//! let receipt = client.purchase(&PurchaseRequest {
//!     item_id: "vid_42".to_string(),
//!     price_cents: 2500,
//!     license_type: None,
//! }).await?;
//!
//! println!("New balance: {} cents", receipt.balance_cents);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, VidpayClient};
pub use error::ClientError;
pub use types::*;
