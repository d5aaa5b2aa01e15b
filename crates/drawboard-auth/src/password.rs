//! Password hashing using Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`), so the salt and cost
//! parameters travel with the hash and verification needs nothing else.

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::PasswordError;

/// Salt length in bytes.
const SALT_BYTES: usize = 16;

/// Irreversible, salted password hashing.
///
/// Both operations are CPU-heavy and synchronous; callers on an async
/// runtime should run them through `spawn_blocking`.
pub trait PasswordHasher: Clone + Send + Sync + 'static {
    /// Hashes `password` with a fresh random salt.
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    /// Returns `Ok(true)` on match, `Ok(false)` on mismatch, and an error
    /// only if `hash` isn't a hash this hasher understands.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id with the crate's default cost parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| PasswordError(format!("salt: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PasswordError(format!("salt: {e}")))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| PasswordError(format!("invalid hash format: {e}")))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError(format!("verify error: {e}"))),
        }
    }
}
