//! HMAC-SHA256 delivery signatures

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::PlatformError;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify an `X-Hub-Signature-256` header (`sha256=<hex>`) against `payload`.
///
/// The digest comparison is constant time.
pub fn verify_signature(header: &str, payload: &[u8], secret: &str) -> Result<(), PlatformError> {
    if header.is_empty() {
        return Err(PlatformError::SignatureInvalid("missing signature header".to_string()));
    }
    let encoded = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| PlatformError::SignatureInvalid("unexpected signature format".to_string()))?;
    let expected = hex::decode(encoded)
        .map_err(|e| PlatformError::SignatureInvalid(format!("decode signature: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PlatformError::Internal(format!("invalid hmac key: {}", e)))?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| PlatformError::SignatureInvalid("signature mismatch".to_string()))
}

/// Compute the `sha256=<hex>` header value for `payload`
pub fn sign(payload: &[u8], secret: &str) -> Result<String, PlatformError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PlatformError::Internal(format!("invalid hmac key: {}", e)))?;
    mac.update(payload);
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes())))
}
