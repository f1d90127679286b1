//! Role gates layered on top of [`AuthUser`].
//!
//! Two levels exist: any signed-in account (`RequireAuth`) and admins only
//! (`RequireAdmin`). Employees may read everything and record payments;
//! corrections, deletions and account management are admin work.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use estate_core::error::CoreError;
use estate_core::roles::ROLE_ADMIN;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

const ADMINS_ONLY: &str = "Access denied. Admins only.";

/// Admin-only extractor; 403 for any other role.
pub struct RequireAdmin(pub AuthUser);

/// Any valid bearer token.
pub struct RequireAuth(pub AuthUser);

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::debug!(user_id = user.user_id, role = %user.role, "Admin route refused");
            return Err(CoreError::Forbidden(ADMINS_ONLY.into()).into());
        }
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state).await.map(Self)
    }
}
