//! Opaque refresh secrets and their storage fingerprints.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use super::AuthError;

/// Default refresh secret length in bytes.
pub const DEFAULT_SECRET_BYTES: usize = 32;

/// Generate `byte_len` bytes from the OS CSPRNG, base64url encoded.
pub fn generate_secret(byte_len: usize) -> Result<String, AuthError> {
    if byte_len == 0 {
        return Err(AuthError::Entropy("secret length must be positive".into()));
    }
    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::Entropy(format!("os rng: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// SHA-256 fingerprint of a raw secret, lowercase hex.
///
/// Fast and unsalted: used to look up and compare refresh secrets, never
/// for passwords.
pub fn fingerprint(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}
