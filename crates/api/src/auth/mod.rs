//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- bearer-token signing and validation.

pub mod jwt;
pub mod password;
