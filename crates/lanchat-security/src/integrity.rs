//! HMAC-SHA256 integrity for encrypted chat payloads.
//!
//! The relay never decrypts ciphertext. It only checks that an
//! attached signature matches the payload under the room key, so a
//! tampered envelope is dropped instead of forwarded.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::Rng as _;
use serde_json::Value;
use sha2::Sha256;

use crate::SecurityError;

type HmacSha256 = Hmac<Sha256>;

/// A 256-bit signing key scoped to the chat room.
///
/// Generated lazily on first use and held server-side only; it is
/// never sent to clients.
#[derive(Clone)]
pub struct RoomKey {
    bytes: [u8; 32],
}

impl std::fmt::Debug for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.write_str("RoomKey(..)")
    }
}

impl RoomKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        Self {
            bytes: rand::rng().random(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.bytes).expect("HMAC accepts any key length")
    }

    /// Canonical signing bytes for a payload: compact JSON with object
    /// keys in sorted order, so both ends serialize identically.
    fn canonical_bytes(payload: &Value) -> Result<Vec<u8>, SecurityError> {
        Ok(serde_json::to_vec(payload)?)
    }

    /// Signs `payload`, returning the base64-encoded HMAC-SHA256 tag.
    pub fn sign(&self, payload: &Value) -> Result<String, SecurityError> {
        let mut mac = self.mac();
        mac.update(&Self::canonical_bytes(payload)?);
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Verifies a base64 signature against `payload` in constant time.
    ///
    /// # Errors
    /// - [`SecurityError::MalformedSignature`] if the base64 is invalid
    /// - [`SecurityError::IntegrityFailure`] if the tag does not match
    pub fn verify(&self, payload: &Value, signature: &str) -> Result<(), SecurityError> {
        let expected = BASE64.decode(signature)?;
        let mut mac = self.mac();
        mac.update(&Self::canonical_bytes(payload)?);
        mac.verify_slice(&expected)
            .map_err(|_| SecurityError::IntegrityFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> Value {
        json!({
            "ciphertext": "0a1b2c3d",
            "iv": "ffeeddcc",
            "tag": "99887766"
        })
    }

    #[test]
    fn test_sign_then_verify_succeeds() {
        let key = RoomKey::generate();
        let payload = envelope();
        let sig = key.sign(&payload).unwrap();
        key.verify(&payload, &sig).unwrap();
    }

    #[test]
    fn test_signature_is_key_order_independent() {
        let key = RoomKey::generate();
        let a = json!({ "ciphertext": "x", "iv": "y", "tag": "z" });
        let b = json!({ "tag": "z", "iv": "y", "ciphertext": "x" });
        assert_eq!(key.sign(&a).unwrap(), key.sign(&b).unwrap());
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let key = RoomKey::generate();
        let sig = key.sign(&envelope()).unwrap();

        let mut tampered = envelope();
        tampered["ciphertext"] = json!("deadbeef");
        assert!(matches!(
            key.verify(&tampered, &sig),
            Err(SecurityError::IntegrityFailure)
        ));
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let payload = envelope();
        let sig = RoomKey::generate().sign(&payload).unwrap();
        assert!(RoomKey::generate().verify(&payload, &sig).is_err());
    }

    #[test]
    fn test_garbage_signature_reports_malformed() {
        let key = RoomKey::generate();
        assert!(matches!(
            key.verify(&envelope(), "not base64 !!!"),
            Err(SecurityError::MalformedSignature(_))
        ));
    }
}
