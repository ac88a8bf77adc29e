//! Identifier types for vidpay.
//!
//! This module provides strongly-typed identifiers for users, orders,
//! ledger transactions and withdrawals.
//!
//! # Macro-based ID Types
//!
//! Two macros reduce boilerplate: `uuid_id_type!` for random identifiers
//! (users, orders) and `ulid_id_type!` for time-ordered identifiers
//! (ledger transactions, withdrawals). ULID-based ids sort
//! chronologically, which keeps the ledger naturally ordered and gives
//! the payment gateways a merchant-order-id that is unique and opaque.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Macro to define a UUID-based identifier type with standard trait
/// implementations.
///
/// Generates a newtype wrapper around `uuid::Uuid` with implementations
/// for `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Serialize`,
/// `Deserialize` (as string), `FromStr`, `Display`, `Debug`,
/// `TryFrom<String>` and `Into<String>`.
macro_rules! uuid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new identifier from a UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Return the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
                Ok(Self(uuid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

/// Macro to define a ULID-based identifier type.
///
/// Same trait surface as `uuid_id_type!` but backed by a ULID so values
/// generated later compare greater, giving natural chronological order.
macro_rules! ulid_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Ulid);

        impl $name {
            /// Create an identifier from a ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Generate a new identifier with the current timestamp.
            ///
            /// Generation is monotonic within the process, so ids
            /// minted in the same millisecond still sort in creation
            /// order.
            #[must_use]
            pub fn generate() -> Self {
                static GENERATOR: std::sync::OnceLock<std::sync::Mutex<ulid::Generator>> =
                    std::sync::OnceLock::new();
                let mut generator = GENERATOR
                    .get_or_init(|| std::sync::Mutex::new(ulid::Generator::new()))
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                // Random-part overflow within one millisecond exhausts
                // 80 bits of entropy; fall back to a fresh ULID.
                Self(generator.generate().unwrap_or_else(|_| Ulid::new()))
            }

            /// Return the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> &Ulid {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid = Ulid::from_string(s).map_err(|_| IdError::InvalidUlid)?;
                Ok(Self(ulid))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0.to_string()
            }
        }
    };
}

uuid_id_type!(UserId, "A user identifier (UUID format from the marketplace identity provider).\n\nUser IDs are extracted from JWT `sub` claims.");
uuid_id_type!(OrderId, "A purchase order identifier (UUID format).");

ulid_id_type!(TransactionId, "A ledger transaction identifier (ULID for time-ordering).\n\nAlso serves as the merchant-order-id sent to payment gateways, and\ntherefore as the idempotency key for their notifications.");
ulid_id_type!(WithdrawalId, "A withdrawal request identifier (ULID for time-ordering).");

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,

    /// The input is not a valid ULID.
    #[error("invalid ULID format")]
    InvalidUlid,
}
