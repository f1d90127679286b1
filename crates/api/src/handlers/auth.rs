//! Handlers for the `/auth` resource: login lifecycle, first-admin setup,
//! password recovery, and admin account management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use estate_core::account::{
    ensure_not_last_admin, ensure_role_unchanged, normalize_email, validate_role,
    RESET_TOKEN_EXPIRY_MINS,
};
use estate_core::error::CoreError;
use estate_core::roles::ROLE_ADMIN;
use estate_core::session::{LoginMode, ACCOUNT_DELETED_REASON};
use estate_core::types::DbId;
use estate_db::models::user::{CreateUser, UpdateUser, UserResponse};
use estate_db::repositories::UserRepo;
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, ClientInfo, OptionalBearer};
use crate::middleware::rbac::RequireAdmin;
use crate::response::MessageResponse;
use crate::sessions::{LoginOutcome, LoginSuccess, SessionManager};
use crate::state::AppState;

/// Random bytes in a password-reset token (hex-encoded on the wire).
const RESET_TOKEN_BYTES: usize = 20;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
///
/// `only_logout` is honoured only together with `force_login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[serde(default, alias = "forceLogin")]
    pub force_login: bool,
    #[serde(default, alias = "onlyLogout")]
    pub only_logout: bool,
}

/// Request body for `POST /auth/register` and `POST /auth/add-user`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 1, message = "CNIC is required"))]
    pub cnic: String,
    pub phone: Option<String>,
    /// Ignored by `register`, which always creates an admin.
    pub role: Option<String>,
}

/// Request body for `PUT /auth/users/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    pub name: Option<String>,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub cnic: Option<String>,
    pub phone: Option<String>,
    /// Accepted only when equal to the current role.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "CNIC is required"))]
    pub cnic: String,
}

#[derive(Debug, Serialize)]
pub struct SetupStatusResponse {
    pub is_initialized: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub session: LoginSuccess,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerifyPasswordResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: &'static str,
    pub reset_token: String,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// POST /api/auth/login
///
/// Returns `{token, user}` on success, `{message}` in logout-only mode, and
/// 409 `ALREADY_LOGGED_IN` with the blocking session's summary otherwise.
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<LoginRequest>,
) -> AppResult<Response> {
    input.validate()?;
    let mode = LoginMode::from_flags(input.force_login, input.only_logout);

    let outcome = SessionManager::from_state(&state)
        .login(&input.email, &input.password, mode, &client)
        .await?;

    match outcome {
        LoginOutcome::LoggedIn(success) => Ok(Json(success).into_response()),
        LoginOutcome::LoggedOut => Ok(Json(MessageResponse::new(
            "All devices logged out successfully.",
        ))
        .into_response()),
        LoginOutcome::Conflict(info) => Err(AppError::SessionConflict(info)),
    }
}

/// POST /api/auth/logout
///
/// Always succeeds; removes the caller's session when the token matches one.
pub async fn logout(
    State(state): State<AppState>,
    OptionalBearer(token): OptionalBearer,
) -> AppResult<Json<MessageResponse>> {
    SessionManager::from_state(&state)
        .logout(token.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<UserResponse>> {
    let account = SessionManager::from_state(&state)
        .touch(user.user_id, &user.token)
        .await?;
    Ok(Json(UserResponse::from(&account)))
}

/// POST /api/auth/verify-password
///
/// Re-confirms the caller's password before a sensitive action.
pub async fn verify_own_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<PasswordRequest>,
) -> AppResult<Json<VerifyPasswordResponse>> {
    let account = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", user.user_id)))?;

    let success = verify_password(&input.password, &account.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    Ok(Json(VerifyPasswordResponse { success }))
}

// ---------------------------------------------------------------------------
// First-admin setup
// ---------------------------------------------------------------------------

/// GET /api/auth/setup-status
pub async fn setup_status(State(state): State<AppState>) -> AppResult<Json<SetupStatusResponse>> {
    let count = UserRepo::count(&state.pool).await?;
    Ok(Json(SetupStatusResponse {
        is_initialized: count > 0,
    }))
}

/// POST /api/auth/register
///
/// Creates the first account as an admin and logs it in. Closed once any
/// account exists.
pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    input.validate()?;

    // 1. Registration is only open on an empty system.
    if UserRepo::count(&state.pool).await? > 0 {
        return Err(AppError::Core(CoreError::Forbidden(
            "System already initialized. Admin account exists.".into(),
        )));
    }

    // 2. Create the admin.
    let user = UserRepo::create(&state.pool, &new_account(&input, ROLE_ADMIN)?).await?;
    tracing::info!(user_id = user.id, "First admin registered");

    // 3. Log it in.
    let session = SessionManager::from_state(&state)
        .open_session(&user, &client)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            session,
            message: "Admin account created successfully",
        }),
    ))
}

// ---------------------------------------------------------------------------
// Password recovery
// ---------------------------------------------------------------------------

/// POST /api/auth/forgot-password
///
/// Verifies email + CNIC of an admin account and returns a short-lived reset
/// token directly.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    input.validate()?;

    let user = UserRepo::find_by_email_and_cnic(&state.pool, &input.email, input.cnic.trim())
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Account", &input.email)))?;

    if user.role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(
            "Recovery feature is restricted to Admin accounts only.".into(),
        )));
    }

    let token = generate_reset_token();
    let expires_at = Utc::now() + chrono::Duration::minutes(RESET_TOKEN_EXPIRY_MINS);
    UserRepo::set_reset_token(&state.pool, user.id, &token, expires_at).await?;
    tracing::info!(user_id = user.id, "Password reset token issued");

    Ok(Json(ForgotPasswordResponse {
        message: "Identity verified.",
        reset_token: token,
        success: true,
    }))
}

/// POST /api/auth/reset-password/{token}
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<PasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let user = UserRepo::find_by_reset_token(&state.pool, &token)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Password reset token is invalid or has expired.".into())
        })?;

    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &hash).await?;
    tracing::info!(user_id = user.id, "Password reset");

    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

// ---------------------------------------------------------------------------
// Account management (admin)
// ---------------------------------------------------------------------------

/// GET /api/auth/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// POST /api/auth/add-user
pub async fn add_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<AccountResponse>)> {
    input.validate()?;
    let role = input
        .role
        .as_deref()
        .unwrap_or(estate_core::roles::ROLE_EMPLOYEE);
    validate_role(role)?;

    if UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "User already exists".into(),
        )));
    }

    let user = UserRepo::create(&state.pool, &new_account(&input, role)?).await?;
    tracing::info!(user_id = user.id, role = %user.role, admin_id = admin.user_id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User created successfully",
            user: UserResponse::from(&user),
        }),
    ))
}

/// PUT /api/auth/users/{id}
///
/// Partial profile update. The role is permanent; any attempt to change it
/// is rejected with 403.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAccountRequest>,
) -> AppResult<Json<AccountResponse>> {
    input.validate()?;

    // 1. Load and check the role invariant.
    let existing = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", id)))?;
    ensure_role_unchanged(&existing.role, input.role.as_deref())?;

    // 2. Hash a replacement password up front so a bad one changes nothing.
    let password_hash = match input.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_password_strength(password, MIN_PASSWORD_LENGTH)
                .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
            Some(
                hash_password(password)
                    .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?,
            )
        }
        None => None,
    };

    // 3. Apply profile fields.
    let update = UpdateUser {
        name: non_empty(input.name),
        email: non_empty(input.email).map(|e| normalize_email(&e)),
        cnic: non_empty(input.cnic),
        phone: non_empty(input.phone),
    };
    let user = UserRepo::update(&state.pool, id, &update)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", id)))?;

    // 4. Apply the password.
    if let Some(hash) = password_hash {
        UserRepo::update_password(&state.pool, id, &hash).await?;
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, "User updated");
    Ok(Json(AccountResponse {
        message: "User updated successfully",
        user: UserResponse::from(&user),
    }))
}

/// DELETE /api/auth/users/{id}
///
/// Evicts the account's sessions (notifying its live connections) before
/// deleting it. The last remaining admin cannot be deleted.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    let target = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("User", id)))?;

    let admin_count = UserRepo::count_admins(&state.pool).await?;
    ensure_not_last_admin(&target.role, admin_count)?;

    SessionManager::from_state(&state)
        .force_evict(id, ACCOUNT_DELETED_REASON)
        .await?;

    // The count above is advisory; the guarded delete decides under lock.
    if !UserRepo::delete_unless_last_admin(&state.pool, id).await? {
        ensure_not_last_admin(&target.role, 1)?;
        return Err(AppError::Core(CoreError::not_found("User", id)));
    }

    tracing::info!(user_id = id, admin_id = admin.user_id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the insert DTO: normalized email, hashed password.
fn new_account(input: &CreateAccountRequest, role: &str) -> AppResult<CreateUser> {
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    Ok(CreateUser {
        name: input.name.trim().to_string(),
        email: normalize_email(&input.email),
        password_hash,
        cnic: input.cnic.trim().to_string(),
        phone: non_empty(input.phone.clone()),
        role: role.to_string(),
    })
}

/// Treat blank strings as "not supplied".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 20 random bytes, lowercase hex.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
