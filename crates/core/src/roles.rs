//! Well-known role name constants.
//!
//! These must match the `CHECK` constraint on `users.role` in
//! `20250101000001_create_users_table.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EMPLOYEE: &str = "employee";

/// All roles an account may hold.
pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_EMPLOYEE];
