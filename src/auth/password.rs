//! Account password hashing.
//!
//! Stored values are PHC strings (`$argon2id$v=19$...`) carrying their own salt
//! and cost parameters, so rows hashed under older parameters still verify.

use anyhow::anyhow;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

fn hasher() -> Argon2<'static> {
    Argon2::default()
}

/// Hash a registration password with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("hash password: {e}"))
}

/// Check a login attempt against the stored hash.
///
/// A mismatch is `Ok(false)`; a stored value that is not a usable hash is an error.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        warn!(error = %e, "stored password is not a PHC hash");
        anyhow!("parse stored password hash: {e}")
    })?;
    match hasher().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("verify password: {e}")),
    }
}
