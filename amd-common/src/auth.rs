//! Password hashing and token generation
//!
//! Passwords are stored as salted SHA-256 digests: a random hex salt per
//! account, hash = SHA-256(salt || password) as 64 hex characters. Session
//! tokens and API keys are v4 UUIDs.

use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a random 16-byte salt as 32 hex characters
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a password with the given salt
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Constant-shape verification against a stored hash
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

/// Generate an opaque session token
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_roundtrip() {
        let salt = generate_salt();
        let hash = hash_password("secret", &salt);

        assert_eq!(hash.len(), 64);
        assert!(verify_password("secret", &salt, &hash));
        assert!(!verify_password("wrong", &salt, &hash));
    }

    #[test]
    fn test_salts_are_unique() {
        let a = generate_salt();
        let b = generate_salt();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_same_password_different_salt_differs() {
        let a = hash_password("secret", "00ff");
        let b = hash_password("secret", "ff00");
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), 36);
        assert_ne!(token, generate_token());
    }
}
