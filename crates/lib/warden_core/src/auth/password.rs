//! Password hashing via bcrypt.

use super::AuthError;

/// Default bcrypt cost factor.
pub const BCRYPT_COST: u32 = 10;

/// Lowest cost bcrypt accepts. Only suitable for tests.
pub const MIN_BCRYPT_COST: u32 = 4;

const MAX_BCRYPT_COST: u32 = 31;

/// One-way adaptive password hashing.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password with a fresh salt.
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;

    /// Check a plaintext password against a stored hash.
    ///
    /// A mismatch and a malformed hash both return `false`.
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}

/// bcrypt-backed [`CredentialHasher`].
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new() -> Self {
        Self { cost: BCRYPT_COST }
    }

    /// Use a custom cost, clamped to bcrypt's accepted range.
    pub fn with_cost(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AuthError::Hashing(format!("bcrypt hash: {e}")))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        match bcrypt::verify(plaintext, hash) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::debug!("bcrypt verify rejected stored hash: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::with_cost(MIN_BCRYPT_COST)
    }

    #[test]
    fn verify_accepts_the_hashed_password() {
        let h = hasher();
        for password in ["Secret123", "", "pässwörd with spaces"] {
            let hash = h.hash(password).unwrap();
            assert!(h.verify(&hash, password), "failed for {password:?}");
        }
    }

    #[test]
    fn verify_rejects_other_passwords() {
        let h = hasher();
        let hash = h.hash("Secret123").unwrap();
        assert!(!h.verify(&hash, "secret123"));
        assert!(!h.verify(&hash, "Secret1234"));
    }

    #[test]
    fn malformed_hash_is_not_an_error() {
        assert!(!hasher().verify("not-a-bcrypt-hash", "Secret123"));
        assert!(!hasher().verify("", ""));
    }

    #[test]
    fn hashes_are_salted() {
        let h = hasher();
        assert_ne!(h.hash("Secret123").unwrap(), h.hash("Secret123").unwrap());
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(BcryptHasher::with_cost(1).cost(), MIN_BCRYPT_COST);
        assert_eq!(BcryptHasher::new().cost(), BCRYPT_COST);
    }
}
