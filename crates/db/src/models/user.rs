//! User (account) entity model and DTOs.

use estate_core::session::ActiveSessions;
use estate_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// An account row, password hash and recovery token included.
///
/// Contains the password hash and session tokens -- NEVER serialize this to
/// API responses directly. Use [`UserResponse`] or [`AccountSummary`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub cnic: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_online: bool,
    pub active_sessions: Json<ActiveSessions>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<Timestamp>,
    /// Bumped on every `active_sessions` write.
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Public-safe identity returned after login and registration.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub role: String,
    pub cnic: String,
}

impl From<&User> for AccountSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            cnic: user.cnic.clone(),
        }
    }
}

/// Safe user representation for listings and profile endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub cnic: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_online: bool,
    pub active_session_count: usize,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            cnic: user.cnic.clone(),
            phone: user.phone.clone(),
            role: user.role.clone(),
            is_online: user.is_online,
            active_session_count: user.active_sessions.len(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// DTO for creating a new user. `email` must already be normalized.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub cnic: String,
    pub phone: Option<String>,
    pub role: String,
}

/// DTO for updating profile fields. All fields are optional. Roles are
/// never updatable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub cnic: Option<String>,
    pub phone: Option<String>,
}
