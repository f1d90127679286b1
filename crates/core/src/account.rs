//! Account invariants shared by every account mutation entry point.
//!
//! - Emails are stored and looked up trimmed and lowercased.
//! - Roles are fixed at creation time.
//! - The last remaining admin account cannot be deleted.

use crate::error::CoreError;
use crate::roles::{ROLE_ADMIN, VALID_ROLES};

/// Lifetime of a password-reset token, in minutes.
pub const RESET_TOKEN_EXPIRY_MINS: i64 = 10;

/// Canonical form of an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate that a role string is one of the accepted values.
pub fn validate_role(role: &str) -> Result<(), CoreError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid role '{role}'. Must be one of: {}",
            VALID_ROLES.join(", ")
        )))
    }
}

/// Reject any attempt to change an account's role.
///
/// Passing the current role again (or no role at all) is accepted.
pub fn ensure_role_unchanged(current: &str, requested: Option<&str>) -> Result<(), CoreError> {
    match requested {
        Some(role) if role != current => Err(CoreError::Forbidden(
            "Role changes are not allowed. Roles are permanent.".into(),
        )),
        _ => Ok(()),
    }
}

/// Reject deleting an admin when it is the only one left.
///
/// `admin_count` includes the target account.
pub fn ensure_not_last_admin(target_role: &str, admin_count: i64) -> Result<(), CoreError> {
    if target_role == ROLE_ADMIN && admin_count <= 1 {
        return Err(CoreError::Conflict(
            "Cannot delete the last remaining Admin account. Create another Admin first.".into(),
        ));
    }
    Ok(())
}
