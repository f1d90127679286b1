//! Password storage: Argon2id PHC strings with a per-hash random salt.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when `stored` is not a usable hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Length is counted in characters, not bytes.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() >= min_length {
        Ok(())
    } else {
        Err(format!("Password must be at least {min_length} characters long"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_mismatch() {
        let stored = hash_password("plot-42-secret").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("plot-42-secret", &stored).unwrap());
        assert!(!verify_password("plot-43-secret", &stored).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("repeat").unwrap(), hash_password("repeat").unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_strength_counts_characters() {
        assert!(validate_password_strength("abc", MIN_PASSWORD_LENGTH)
            .unwrap_err()
            .contains("at least 6 characters"));
        assert!(validate_password_strength("secret", MIN_PASSWORD_LENGTH).is_ok());
        // Six two-byte characters.
        assert!(validate_password_strength("éééééé", MIN_PASSWORD_LENGTH).is_ok());
    }
}
