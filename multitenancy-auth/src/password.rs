// Password hashing and verification

use crate::{AuthError, Result};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

/// Password hashing algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// Bcrypt (slower but battle-tested)
    Bcrypt,
    /// Argon2 (modern, recommended)
    Argon2,
}

impl HashAlgorithm {
    /// Detect the algorithm a stored hash was produced with
    pub fn detect(hash: &str) -> Option<Self> {
        if hash.starts_with("$2") {
            Some(HashAlgorithm::Bcrypt)
        } else if hash.starts_with("$argon2") {
            Some(HashAlgorithm::Argon2)
        } else {
            None
        }
    }
}

/// Checks a plain-text password against a stored hash
pub trait PasswordVerifier: Send + Sync {
    /// Verify a password against a hash
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Password hasher
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    algorithm: HashAlgorithm,
}

impl PasswordHasher {
    /// Create a new password hasher
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a password
    pub fn hash(&self, password: &str) -> Result<String> {
        match self.algorithm {
            HashAlgorithm::Bcrypt => bcrypt::hash(password, bcrypt::DEFAULT_COST)
                .map_err(|e| AuthError::PasswordHashError(e.to_string())),
            HashAlgorithm::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map(|hash| hash.to_string())
                    .map_err(|e| AuthError::PasswordHashError(e.to_string()))
            }
        }
    }

    /// Whether a stored hash was made with another algorithm than ours
    pub fn needs_rehash(&self, hash: &str) -> bool {
        HashAlgorithm::detect(hash) != Some(self.algorithm)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::Argon2)
    }
}

impl PasswordVerifier for PasswordHasher {
    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        // Any supported format verifies, whatever we hash new passwords with
        match HashAlgorithm::detect(hash) {
            Some(HashAlgorithm::Bcrypt) => bcrypt::verify(password, hash)
                .map_err(|e| AuthError::PasswordVerifyError(e.to_string())),
            Some(HashAlgorithm::Argon2) => {
                let parsed_hash = PasswordHash::new(hash)
                    .map_err(|e| AuthError::PasswordVerifyError(e.to_string()))?;

                Ok(Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok())
            }
            None => Err(AuthError::PasswordVerifyError(
                "Unknown hash format".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcrypt_hashing() {
        let hasher = PasswordHasher::new(HashAlgorithm::Bcrypt);
        let password = "tenant-password-123";

        let hash = hasher.hash(password).unwrap();
        assert_eq!(HashAlgorithm::detect(&hash), Some(HashAlgorithm::Bcrypt));

        assert!(hasher.verify(password, &hash).unwrap());
        assert!(!hasher.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_argon2_hashing() {
        let hasher = PasswordHasher::default();
        let password = "tenant-password-456";

        let hash = hasher.hash(password).unwrap();
        assert!(hash.starts_with("$argon2"));

        assert!(hasher.verify(password, &hash).unwrap());
        assert!(!hasher.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_verify_any_supported_format() {
        let bcrypt_hash = PasswordHasher::new(HashAlgorithm::Bcrypt).hash("pw").unwrap();

        let verifier = PasswordHasher::default();
        assert!(verifier.verify("pw", &bcrypt_hash).unwrap());
        assert!(verifier.needs_rehash(&bcrypt_hash));
        assert!(!PasswordHasher::new(HashAlgorithm::Bcrypt).needs_rehash(&bcrypt_hash));
    }

    #[test]
    fn test_unknown_format() {
        let err = PasswordHasher::default().verify("pw", "plain-text").unwrap_err();
        assert!(matches!(err, AuthError::PasswordVerifyError(_)));
        assert!(PasswordHasher::default().needs_rehash("plain-text"));
    }
}
