//! Gateway B notification verification and payload decryption.
//!
//! Gateway B posts JSON notifications authenticated by signature
//! headers: HMAC-SHA256 (hex) over `"{timestamp}\n{nonce}\n{body}"`
//! with a shared webhook secret. Timestamps older than the allowed
//! skew are rejected to blunt replay of captured requests. The
//! notification's sensitive payload travels AES-256-GCM encrypted
//! under a separate pre-shared API key.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Maximum accepted clock skew between the notification timestamp and
/// our clock, in seconds.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

/// Signature header names sent by gateway B.
pub mod headers {
    /// Hex HMAC-SHA256 signature.
    pub const SIGNATURE: &str = "gateway-signature";
    /// Certificate/key serial (logged, not used for verification).
    pub const SERIAL: &str = "gateway-serial";
    /// Random nonce included in the signed message.
    pub const NONCE: &str = "gateway-nonce";
    /// Unix timestamp (seconds) included in the signed message.
    pub const TIMESTAMP: &str = "gateway-timestamp";
}

/// Errors from gateway B verification and decryption.
#[derive(Debug, thiserror::Error)]
pub enum GatewayBError {
    /// The configured API key is not a base64-encoded 32-byte key.
    #[error("gateway B API key must be 32 bytes, base64-encoded")]
    InvalidKey,

    /// Base64 decoding of the resource failed.
    #[error("invalid resource encoding: {0}")]
    BadEncoding(String),

    /// AES-256-GCM decryption failed (wrong key, nonce or tampering).
    #[error("resource decryption failed")]
    DecryptFailed,

    /// The decrypted payload is not the expected JSON document.
    #[error("invalid resource payload: {0}")]
    BadPayload(String),
}

/// Payment status reported inside the encrypted resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Payment completed; the only status that settles a claim.
    Paid,
    /// Payment still in progress.
    Pending,
    /// Payment window closed without completion.
    Closed,
    /// Any status this service does not know; treated as non-paid.
    #[serde(other)]
    Other,
}

/// Decrypted notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResource {
    /// Our transaction id, echoed back by the gateway.
    pub merchant_order_id: String,
    /// Paid amount in cents.
    pub amount_cents: i64,
    /// Payment status.
    pub status: PaymentStatus,
}

/// The encrypted `resource` envelope of a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedResource {
    /// Base64 AES-256-GCM ciphertext (tag appended).
    pub ciphertext: String,
    /// Base64 12-byte nonce.
    pub nonce: String,
    /// Associated data, authenticated but not encrypted.
    pub associated_data: String,
}

/// Verifier and decryptor for gateway B notifications.
#[derive(Clone)]
pub struct GatewayBVerifier {
    webhook_secret: String,
    api_key: [u8; 32],
}

impl GatewayBVerifier {
    /// Create a verifier from the webhook secret and the base64-encoded
    /// 32-byte API key.
    pub fn new(webhook_secret: String, api_key_b64: &str) -> Result<Self, GatewayBError> {
        let key_bytes = BASE64
            .decode(api_key_b64)
            .map_err(|_| GatewayBError::InvalidKey)?;
        let api_key: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| GatewayBError::InvalidKey)?;

        Ok(Self {
            webhook_secret,
            api_key,
        })
    }

    /// Verify the signature headers against the raw body.
    ///
    /// Returns `false` for an unparseable or stale timestamp as well as
    /// for a signature mismatch.
    #[must_use]
    pub fn verify(&self, timestamp: &str, nonce: &str, body: &str, signature: &str) -> bool {
        if !timestamp_fresh(timestamp, chrono::Utc::now().timestamp()) {
            return false;
        }
        let expected = self.sign(timestamp, nonce, body);
        constant_time_eq(&expected, &signature.to_lowercase())
    }

    /// Compute the signature for a message.
    #[must_use]
    pub fn sign(&self, timestamp: &str, nonce: &str, body: &str) -> String {
        let message = format!("{timestamp}\n{nonce}\n{body}");
        hmac_sha256_hex(&self.webhook_secret, &message)
    }

    /// Decrypt the `resource` envelope into its payment facts.
    pub fn decrypt_resource(
        &self,
        resource: &EncryptedResource,
    ) -> Result<PaymentResource, GatewayBError> {
        let ciphertext = BASE64
            .decode(&resource.ciphertext)
            .map_err(|e| GatewayBError::BadEncoding(e.to_string()))?;
        let nonce_bytes = BASE64
            .decode(&resource.nonce)
            .map_err(|e| GatewayBError::BadEncoding(e.to_string()))?;
        if nonce_bytes.len() != 12 {
            return Err(GatewayBError::BadEncoding(format!(
                "nonce must be 12 bytes, got {}",
                nonce_bytes.len()
            )));
        }

        let cipher =
            Aes256Gcm::new_from_slice(&self.api_key).map_err(|_| GatewayBError::InvalidKey)?;
        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: &ciphertext,
                    aad: resource.associated_data.as_bytes(),
                },
            )
            .map_err(|_| GatewayBError::DecryptFailed)?;

        serde_json::from_slice(&plaintext).map_err(|e| GatewayBError::BadPayload(e.to_string()))
    }

    /// Encrypt a payload into a `resource` envelope.
    ///
    /// The service never sends notifications; this exists for gateway
    /// simulators in tests and tooling.
    pub fn encrypt_resource(
        &self,
        payload: &PaymentResource,
        nonce: &[u8; 12],
        associated_data: &str,
    ) -> Result<EncryptedResource, GatewayBError> {
        let plaintext =
            serde_json::to_vec(payload).map_err(|e| GatewayBError::BadPayload(e.to_string()))?;
        let cipher =
            Aes256Gcm::new_from_slice(&self.api_key).map_err(|_| GatewayBError::InvalidKey)?;
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: &plaintext,
                    aad: associated_data.as_bytes(),
                },
            )
            .map_err(|_| GatewayBError::DecryptFailed)?;

        Ok(EncryptedResource {
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
            associated_data: associated_data.to_string(),
        })
    }
}

fn timestamp_fresh(timestamp: &str, now: i64) -> bool {
    timestamp
        .parse::<i64>()
        .map(|ts| (now - ts).abs() <= MAX_TIMESTAMP_SKEW_SECS)
        .unwrap_or(false)
}
