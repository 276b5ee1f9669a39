//! Password hashing and session tokens
//!
//! Passwords are stored as bcrypt hashes. Session tokens are random and only
//! their SHA-256 digest is persisted.

use std::sync::OnceLock;

use rand::RngCore;
use sha2::{Digest, Sha256};

/// bcrypt work factor for stored passwords
pub const HASH_COST: u32 = 10;
const TOKEN_LEN: usize = 32;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt failure: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(password, HASH_COST)?)
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

/// Check a password for an account that may not exist.
///
/// Without a stored hash the password is still run through bcrypt at the
/// same cost, so an unknown badge takes as long to reject as a wrong password.
pub fn verify_account_password(password: &str, stored: Option<&str>) -> bool {
    match stored {
        Some(stored) => verify_password(password, stored),
        None => {
            verify_password(password, dummy_hash());
            false
        }
    }
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        let mut seed = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut seed);
        bcrypt::hash(hex::encode(seed), HASH_COST).unwrap_or_default()
    })
}

/// [`hash_password`] off the async runtime
pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

/// [`verify_account_password`] off the async runtime
pub async fn verify_account_password_blocking(
    password: String,
    stored: Option<String>,
) -> Result<bool, PasswordError> {
    let verified =
        tokio::task::spawn_blocking(move || verify_account_password(&password, stored.as_deref()))
            .await?;
    Ok(verified)
}

/// Generate an opaque session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash under which a session token is stored
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("andres91").unwrap();
        assert!(stored.starts_with("$2b$10$"));
        assert!(verify_password("andres91", &stored));
        assert!(!verify_password("andres92", &stored));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("123456").unwrap(), hash_password("123456").unwrap());
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "sha256$10000$00$00"));
        assert!(!verify_password("x", "$2b$10$tooshort"));
    }

    #[test]
    fn test_unknown_account_never_verifies() {
        assert!(!verify_account_password("andres91", None));
        assert!(!verify_account_password("", None));
    }

    #[test]
    fn test_unknown_account_pays_full_hash_cost() {
        let dummy = dummy_hash();
        let parts: bcrypt::HashParts = dummy.parse().unwrap();
        assert_eq!(parts.get_cost(), HASH_COST);
        // the comparison must run to completion rather than fail on parsing
        assert!(bcrypt::verify("andres91", dummy).is_ok());
    }

    #[test]
    fn test_known_account_uses_stored_hash() {
        let stored = hash_password("andres91").unwrap();
        assert!(verify_account_password("andres91", Some(&stored)));
        assert!(!verify_account_password("andres92", Some(&stored)));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let stored = hash_password_blocking("andres91".to_string()).await.unwrap();
        assert!(verify_account_password_blocking("andres91".to_string(), Some(stored))
            .await
            .unwrap());
        assert!(!verify_account_password_blocking("andres91".to_string(), None)
            .await
            .unwrap());
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN * 2);
        assert_ne!(token, generate_token());
        assert_eq!(token_hash(&token).len(), 64);
        assert_eq!(token_hash(&token), token_hash(&token));
    }
}
