//! Password hashing with Argon2, temporary passwords and strength checks

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distr::Alphanumeric, Rng};
use thiserror::Error;

use clinic_shared::constants::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH};

/// Minimum zxcvbn score (0..=4) accepted for account passwords.
pub const MIN_PASSWORD_SCORE: u8 = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Hash error: {0}")]
    HashError(String),
    #[error("Password must be at least {0} characters")]
    TooShort(usize),
    #[error("Password must be at most {0} characters")]
    TooLong(usize),
    #[error("Password is too weak")]
    TooWeak,
}

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::HashError(e.to_string()))
    }

    pub fn verify(password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Random alphanumeric password handed to accounts created on someone's behalf.
    pub fn generate_temporary(length: usize) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect()
    }

    /// Length bounds first, then a zxcvbn estimate with the user's own details
    /// as penalised dictionary words.
    pub fn check_strength(password: &str, user_inputs: &[&str]) -> Result<(), PasswordError> {
        let len = password.chars().count();
        if len < MIN_PASSWORD_LENGTH {
            return Err(PasswordError::TooShort(MIN_PASSWORD_LENGTH));
        }
        if len > MAX_PASSWORD_LENGTH {
            return Err(PasswordError::TooLong(MAX_PASSWORD_LENGTH));
        }
        let estimate = zxcvbn::zxcvbn(password, user_inputs);
        if (estimate.score() as u8) < MIN_PASSWORD_SCORE {
            return Err(PasswordError::TooWeak);
        }
        Ok(())
    }
}
