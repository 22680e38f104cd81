//! Password hashing, strength rules and temporary password generation.
//!
//! Hashes use Argon2id in PHC string format. Temporary passwords are handed out
//! when an admin creates an account or resets a password without choosing one;
//! the account is then flagged to change it on next login.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

/// Error type for password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2id parameters (OWASP 2024): 19 MiB, 2 iterations, 1 lane.
const MEMORY_COST: u32 = 19456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

/// Minimum password length accepted for account passwords.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length accepted (bounds hashing cost).
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Length of generated temporary passwords.
pub const TEMPORARY_PASSWORD_LENGTH: usize = 12;

// Ambiguous glyphs (0/O, 1/l/I) left out so passwords can be read over the phone.
const TEMP_LETTERS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";
const TEMP_DIGITS: &[u8] = b"23456789";

fn create_argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_COST, TIME_COST, PARALLELISM, Some(OUTPUT_LEN))
        .map_err(|e| PasswordError::HashError(format!("Failed to create Argon2 params: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password using Argon2id. Returns a PHC-formatted string.
///
/// ```
/// use shared::password::hash_password;
///
/// let hash = hash_password("Obra2024segura").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = create_argon2()?;

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored PHC hash (constant time).
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    // Parameters are read from the hash itself.
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Checks the account password policy.
///
/// Returns a user-facing message describing the first rule that failed.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LENGTH
        ));
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err("Password must contain at least one letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    Ok(())
}

/// Generates a random temporary password that satisfies the password policy.
pub fn generate_temporary_password() -> String {
    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = Vec::with_capacity(TEMPORARY_PASSWORD_LENGTH);

    chars.push(TEMP_LETTERS[rng.gen_range(0..TEMP_LETTERS.len())]);
    chars.push(TEMP_DIGITS[rng.gen_range(0..TEMP_DIGITS.len())]);

    let pool: Vec<u8> = TEMP_LETTERS.iter().chain(TEMP_DIGITS).copied().collect();
    while chars.len() < TEMPORARY_PASSWORD_LENGTH {
        chars.push(pool[rng.gen_range(0..pool.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
