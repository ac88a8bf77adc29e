//! Purchase order types for vidpay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, UserId};

/// A completed purchase of a catalog item.
///
/// Orders are created atomically with their debiting ledger transaction
/// and are immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,

    /// The buyer.
    pub user_id: UserId,

    /// Catalog item reference (the video catalog is an external
    /// collaborator; the id is opaque here).
    pub item_id: String,

    /// Price paid in cents.
    pub price_cents: i64,

    /// License granted with the purchase.
    pub license_type: LicenseType,

    /// When the purchase completed.
    pub completed_at: DateTime<Utc>,
}

impl Order {
    /// Create a completed order.
    #[must_use]
    pub fn new(user_id: UserId, item_id: String, price_cents: i64, license_type: LicenseType) -> Self {
        Self {
            id: OrderId::generate(),
            user_id,
            item_id,
            price_cents,
            license_type,
            completed_at: Utc::now(),
        }
    }
}

/// License granted with a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
    /// Personal, non-commercial use.
    Personal,

    /// Commercial use.
    Commercial,
}

impl LicenseType {
    /// Stable string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Commercial => "commercial",
        }
    }

    /// Parse the storage string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            "commercial" => Some(Self::Commercial),
            _ => None,
        }
    }
}
