//! Password hashing and complexity validation.
//!
//! Hashes are Argon2id in PHC string format, salted per password. The
//! validation path checks the cheap policy rules before any hashing happens.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::config::PasswordPolicy;
use crate::error::{PasswordRule, Result, WardenError};

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| WardenError::Hashing(err.to_string()))
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` for a well-formed hash that does not match; a
/// malformed stored hash is an operational error, not a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|err| WardenError::Hashing(err.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(WardenError::Hashing(err.to_string())),
    }
}

/// Check a candidate password against the policy.
///
/// Reports the first unmet rule in a fixed order so messages are stable.
pub fn validate_password(password: &str, policy: &PasswordPolicy) -> Result<()> {
    if password.chars().count() < policy.min_length {
        return Err(WardenError::PolicyViolation(PasswordRule::TooShort {
            min: policy.min_length,
        }));
    }
    if policy.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err(WardenError::PolicyViolation(PasswordRule::MissingUppercase));
    }
    if policy.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return Err(WardenError::PolicyViolation(PasswordRule::MissingLowercase));
    }
    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(WardenError::PolicyViolation(PasswordRule::MissingDigit));
    }
    if policy.require_symbol && !password.chars().any(|c| !c.is_alphanumeric()) {
        return Err(WardenError::PolicyViolation(PasswordRule::MissingSymbol));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
