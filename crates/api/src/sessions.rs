//! Session Lifecycle Manager.
//!
//! Decides whether a login is admitted, refused with a conflict, or forced
//! through; keeps each account's Session Store in step; issues bearer tokens;
//! and evicts sessions on logout, forced login, and account deletion.
//!
//! Every store mutation is one version-checked write of the whole session
//! list. Steps run strictly in order: prune (and persist), decide, evict,
//! admit.

use chrono::Utc;
use estate_core::account::normalize_email;
use estate_core::error::CoreError;
use estate_core::session::{
    decide_login, ActiveSessions, LoginDecision, LoginMode, Session, SessionInfo,
    FORCE_LOGIN_REASON,
};
use estate_core::types::DbId;
use estate_db::models::user::{AccountSummary, User};
use estate_db::repositories::UserRepo;
use estate_db::DbPool;
use serde::Serialize;
use serde_json::json;

use crate::auth::jwt::{generate_access_token, validate_token, Claims, JwtConfig};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::ClientInfo;
use crate::state::AppState;
use crate::ws::WsManager;

/// Event sent to an account's live connections when its sessions are evicted.
pub const FORCE_LOGOUT_EVENT: &str = "force-logout";

const EMAIL_NOT_FOUND: &str = "Email not found. Please check your email or ID.";
const INCORRECT_PASSWORD: &str = "Incorrect password. Please try again.";

/// Token and public account summary returned by a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSuccess {
    pub token: String,
    pub user: AccountSummary,
}

/// Result of a login attempt that passed credential checks.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// A new session was started.
    LoggedIn(LoginSuccess),
    /// A live session blocks a non-forced login.
    Conflict(SessionInfo),
    /// Logout-only mode: every session was evicted, no token issued.
    LoggedOut,
}

/// Session lifecycle operations, borrowing their collaborators.
pub struct SessionManager<'a> {
    pool: &'a DbPool,
    jwt: &'a JwtConfig,
    relay: &'a WsManager,
}

fn concurrent_modification() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Account was modified concurrently. Please retry.".into(),
    ))
}

impl<'a> SessionManager<'a> {
    pub fn new(pool: &'a DbPool, jwt: &'a JwtConfig, relay: &'a WsManager) -> Self {
        Self { pool, jwt, relay }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.pool, &state.config.jwt, &state.ws_manager)
    }

    /// Attempt a login.
    ///
    /// Unknown email and wrong password are distinct
    /// [`CoreError::InvalidCredentials`] messages.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        mode: LoginMode,
        client: &ClientInfo,
    ) -> AppResult<LoginOutcome> {
        // 1. Find the account by normalized email.
        let email = normalize_email(email);
        let mut user = UserRepo::find_by_email(self.pool, &email)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::InvalidCredentials(EMAIL_NOT_FOUND.into())))?;

        // 2. Verify password.
        let password_valid = verify_password(password, &user.password_hash)
            .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
        if !password_valid {
            return Err(AppError::Core(CoreError::InvalidCredentials(
                INCORRECT_PASSWORD.into(),
            )));
        }

        // 3. Prune stale sessions and persist before deciding anything.
        let now = Utc::now();
        let mut sessions = user.active_sessions.0.clone();
        let pruned = sessions.prune_stale(now);
        if pruned > 0 {
            tracing::info!(user_id = user.id, pruned, "Pruned stale sessions");
            user = self.save(&user, &sessions).await?;
        }

        // 4. Decide.
        match decide_login(&sessions, mode) {
            LoginDecision::Conflict(info) => {
                tracing::info!(user_id = user.id, "Login refused: account already logged in");
                Ok(LoginOutcome::Conflict(info))
            }
            LoginDecision::Admit => {
                let success = self.start_session(&user, sessions, client).await?;
                Ok(LoginOutcome::LoggedIn(success))
            }
            // 5. Forced: evict everyone, then optionally admit.
            LoginDecision::EvictThenAdmit => {
                let (user, sessions) = self.evict(&user, sessions, FORCE_LOGIN_REASON).await?;
                let success = self.start_session(&user, sessions, client).await?;
                Ok(LoginOutcome::LoggedIn(success))
            }
            LoginDecision::EvictOnly => {
                self.evict(&user, sessions, FORCE_LOGIN_REASON).await?;
                tracing::info!(user_id = user.id, "Logged out all devices");
                Ok(LoginOutcome::LoggedOut)
            }
        }
    }

    /// Remove the session holding `token`.
    ///
    /// Idempotent: a missing, invalid or unknown token is a successful no-op.
    /// Returns whether a session was removed.
    pub async fn logout(&self, token: Option<&str>) -> AppResult<bool> {
        let Some(token) = token else {
            return Ok(false);
        };
        let Ok(claims) = validate_token(token, self.jwt) else {
            return Ok(false);
        };
        let Some(user) = UserRepo::find_by_id(self.pool, claims.sub).await? else {
            return Ok(false);
        };

        let mut sessions = user.active_sessions.0.clone();
        if !sessions.remove_token(token) {
            return Ok(false);
        }
        self.save(&user, &sessions).await?;
        tracing::info!(user_id = user.id, remaining = sessions.len(), "User logged out");
        Ok(true)
    }

    /// Clear every session of `account_id` and tell its live connections why.
    ///
    /// Does not delete the account. Returns the number of sessions removed.
    pub async fn force_evict(&self, account_id: DbId, reason: &str) -> AppResult<usize> {
        let user = UserRepo::find_by_id(self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found("User", account_id)))?;
        let sessions = user.active_sessions.0.clone();
        let count = sessions.len();
        self.evict(&user, sessions, reason).await?;
        Ok(count)
    }

    /// Stateless signature and expiry check. The session store is not consulted.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        validate_token(token, self.jwt)
            .map_err(|_| AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())))
    }

    /// Bump `last_activity` on the caller's session, if it still exists.
    ///
    /// Best-effort and version-neutral, so concurrent tabs and logins never
    /// conflict with it. Returns the current account row.
    pub async fn touch(&self, account_id: DbId, token: &str) -> AppResult<User> {
        if let Some(user) =
            UserRepo::touch_session(self.pool, account_id, token, Utc::now()).await?
        {
            return Ok(user);
        }
        UserRepo::find_by_id(self.pool, account_id)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::not_found("User", account_id)))
    }

    /// Start a session for a freshly created account (first-admin setup).
    pub async fn open_session(&self, user: &User, client: &ClientInfo) -> AppResult<LoginSuccess> {
        let sessions = user.active_sessions.0.clone();
        self.start_session(user, sessions, client).await
    }

    // ---- internals ----

    /// Clear `sessions`, notify the account's sockets, persist the empty list.
    async fn evict(
        &self,
        user: &User,
        mut sessions: ActiveSessions,
        reason: &str,
    ) -> AppResult<(User, ActiveSessions)> {
        let cleared = sessions.clear();
        let notified = self
            .relay
            .notify_account(user.id, FORCE_LOGOUT_EVENT, &json!({ "reason": reason }))
            .await;
        tracing::info!(user_id = user.id, cleared, notified, reason, "Evicted sessions");
        let user = self.save(user, &sessions).await?;
        Ok((user, sessions))
    }

    /// Mint a token, append its session, persist.
    async fn start_session(
        &self,
        user: &User,
        mut sessions: ActiveSessions,
        client: &ClientInfo,
    ) -> AppResult<LoginSuccess> {
        let token = generate_access_token(user.id, &user.role, &user.name, self.jwt)
            .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

        sessions.push(Session::new(
            token.clone(),
            Utc::now(),
            client.user_agent.clone(),
            client.origin_address.clone(),
        ));
        let user = self.save(user, &sessions).await?;
        tracing::info!(
            user_id = user.id,
            user_agent = %client.user_agent,
            origin = %client.origin_address,
            "User logged in"
        );

        Ok(LoginSuccess {
            token,
            user: AccountSummary::from(&user),
        })
    }

    async fn save(&self, user: &User, sessions: &ActiveSessions) -> AppResult<User> {
        UserRepo::save_sessions(self.pool, user.id, user.version, sessions)
            .await?
            .ok_or_else(concurrent_modification)
    }
}
