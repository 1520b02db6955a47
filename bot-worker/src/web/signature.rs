//! Discord interaction signature verification.
//!
//! Discord signs every interaction webhook with Ed25519 over the
//! concatenation of the `x-signature-timestamp` header and the raw
//! request body.
//! Reference: https://discord.com/developers/docs/interactions/overview#setting-up-an-endpoint

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::warn;

/// Verify a Discord interaction signature.
///
/// # Arguments
///
/// * `public_key_hex` - The application's hex-encoded Ed25519 public key
/// * `signature_hex` - The `x-signature-ed25519` header value
/// * `timestamp` - The `x-signature-timestamp` header value
/// * `body` - The raw request body, byte for byte as received
///
/// # Returns
///
/// `true` only if the signature verifies. Absent or malformed inputs
/// (non-hex, wrong length, invalid curve point) return `false` and never
/// panic; this function is the sole authorization gate and must run
/// before any body parsing.
pub fn verify_signature(
    public_key_hex: &str,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> bool {
    if public_key_hex.is_empty() || signature_hex.is_empty() || timestamp.is_empty() {
        warn!(
            has_public_key = !public_key_hex.is_empty(),
            has_signature = !signature_hex.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            "interaction_signature_missing_fields"
        );
        return false;
    }

    let key_bytes: [u8; 32] = match hex::decode(public_key_hex) {
        Ok(bytes) => match bytes.try_into() {
            Ok(arr) => arr,
            Err(_) => {
                warn!("interaction_signature_bad_key_length");
                return false;
            }
        },
        Err(_) => {
            warn!("interaction_signature_key_not_hex");
            return false;
        }
    };

    let verifying_key = match VerifyingKey::from_bytes(&key_bytes) {
        Ok(k) => k,
        Err(_) => {
            warn!("interaction_signature_invalid_key");
            return false;
        }
    };

    let sig_bytes: [u8; 64] = match hex::decode(signature_hex) {
        Ok(bytes) => match bytes.try_into() {
            Ok(arr) => arr,
            Err(_) => {
                warn!("interaction_signature_bad_signature_length");
                return false;
            }
        },
        Err(_) => {
            warn!("interaction_signature_not_hex");
            return false;
        }
    };

    let signature = Signature::from_bytes(&sig_bytes);

    // Signed message is timestamp bytes immediately followed by the raw
    // body bytes, with no re-encoding in between.
    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    let valid = verifying_key.verify(&message, &signature).is_ok();

    if !valid {
        warn!(
            timestamp = %timestamp,
            body_length = body.len(),
            "interaction_signature_mismatch"
        );
    }

    valid
}
