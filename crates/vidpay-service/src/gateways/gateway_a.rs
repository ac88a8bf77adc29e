//! Gateway A notification verification.
//!
//! Gateway A posts form-encoded notifications signed in the body: the
//! `sign` field carries HMAC-SHA256 (hex) over a canonical string built
//! from every other field. Unknown fields participate in the canonical
//! string, so new gateway fields never break verification.

use std::collections::BTreeMap;

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Form fields excluded from the canonical string.
const EXCLUDED_FIELDS: [&str; 2] = ["sign", "sign_type"];

/// Trade status value that denotes a completed payment.
pub const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

/// Verifier for gateway A's body-signed form notifications.
#[derive(Debug, Clone)]
pub struct GatewayAVerifier {
    secret: String,
}

impl GatewayAVerifier {
    /// Create a verifier with the shared secret.
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// Verify the `sign` field of a parsed notification.
    ///
    /// Returns `false` when the field is missing or does not match.
    #[must_use]
    pub fn verify(&self, fields: &BTreeMap<String, String>) -> bool {
        let Some(sign) = fields.get("sign") else {
            return false;
        };
        let expected = self.sign(fields);
        constant_time_eq(&expected, &sign.to_lowercase())
    }

    /// Compute the signature for a set of fields.
    #[must_use]
    pub fn sign(&self, fields: &BTreeMap<String, String>) -> String {
        hmac_sha256_hex(&self.secret, &canonical_string(fields))
    }
}

/// Build the canonical string: drop `sign`/`sign_type`, keep the
/// remaining pairs sorted by key, join as `k=v` with `&`.
fn canonical_string(fields: &BTreeMap<String, String>) -> String {
    let mut parts = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        if EXCLUDED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        parts.push(format!("{key}={value}"));
    }
    parts.join("&")
}
