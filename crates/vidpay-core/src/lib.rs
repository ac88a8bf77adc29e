//! Core types for the vidpay settlement subsystem.
//!
//! This crate provides the foundational types used throughout vidpay:
//!
//! - **Identifiers**: `UserId`, `OrderId`, `TransactionId`, `WithdrawalId`
//! - **Accounts**: `Account`
//! - **Ledger**: `Transaction`, `TxOrigin`, `TxStatus`, `PayChannel`
//! - **Withdrawals**: `Withdrawal`, `WithdrawalStatus`
//! - **Orders**: `Order`, `LicenseType`
//!
//! # Money
//!
//! All monetary values are integer cents stored as `i64`. Ledger amounts
//! are always positive; the origin of a transaction determines whether
//! it credits or debits the balance.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod ids;
pub mod ledger;
pub mod order;
pub mod withdrawal;

pub use account::Account;
pub use error::{validate_amount, CoreError, Result};
pub use ids::{IdError, OrderId, TransactionId, UserId, WithdrawalId};
pub use ledger::{PayChannel, Transaction, TxOrigin, TxStatus};
pub use order::{LicenseType, Order};
pub use withdrawal::{Withdrawal, WithdrawalStatus};
