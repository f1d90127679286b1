//! `users`: accounts, their session lists, and password recovery state.

use estate_core::roles::ROLE_ADMIN;
use estate_core::session::ActiveSessions;
use estate_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User};

const COLUMNS: &str = "id, name, email, password_hash, cnic, phone, role, is_online, \
                        active_sessions, reset_password_token, reset_password_expires, \
                        version, created_at, updated_at";

/// Account queries. Session writes go through [`UserRepo::save_sessions`].
pub struct UserRepo;

impl UserRepo {
    /// New accounts start offline with an empty session list.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, password_hash, cnic, phone, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.cnic)
            .bind(&input.phone)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email, ignoring case and surrounding whitespace.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE lower(email) = lower(trim($1))");
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a user matching both email and CNIC (password recovery).
    pub async fn find_by_email_and_cnic(
        pool: &PgPool,
        email: &str,
        cnic: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE lower(email) = lower(trim($1)) AND cnic = $2"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(cnic)
            .fetch_optional(pool)
            .await
    }

    /// Newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Total number of accounts.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    /// Number of admin accounts.
    pub async fn count_admins(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(ROLE_ADMIN)
            .fetch_one(pool)
            .await
    }

    /// Update profile fields. Only non-`None` fields in `input` are applied.
    ///
    /// `None` when the account is gone.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                cnic = COALESCE($4, cnic),
                phone = COALESCE($5, phone)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.cnic)
            .bind(&input.phone)
            .fetch_optional(pool)
            .await
    }

    /// Replace a user's password hash and clear any pending reset token.
    /// `false` when nothing matched.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user unless it is the only remaining admin.
    ///
    /// The admin rows are locked first, so two admins deleting each other
    /// concurrently serialize and the second delete sees the first. Returns
    /// `false` when nothing was deleted: the row is gone or it is the last
    /// admin.
    pub async fn delete_unless_last_admin(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT id FROM users WHERE role = $1 FOR UPDATE")
            .bind(ROLE_ADMIN)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(
            "DELETE FROM users
             WHERE id = $1
               AND (role <> $2
                    OR (SELECT COUNT(*) FROM users WHERE role = $2 AND id <> $1) > 0)",
        )
        .bind(id)
        .bind(ROLE_ADMIN)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the whole session list in one statement.
    ///
    /// `is_online` is derived from the list (true iff it is non-empty). The
    /// write only succeeds if the row still has `expected_version`; on a
    /// version mismatch (or a deleted row) this returns `None` and nothing
    /// is written.
    pub async fn save_sessions(
        pool: &PgPool,
        id: DbId,
        expected_version: i64,
        sessions: &ActiveSessions,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET
                active_sessions = $3,
                is_online = jsonb_array_length($3) > 0,
                version = version + 1
             WHERE id = $1 AND version = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(Json(sessions))
            .fetch_optional(pool)
            .await
    }

    /// Set `last_activity` on the session holding `token`, in place.
    ///
    /// Does not bump `version`: a concurrent whole-list write may overwrite
    /// the new timestamp, which is acceptable for an activity marker. `None`
    /// when the account is gone or holds no session for `token`.
    pub async fn touch_session(
        pool: &PgPool,
        id: DbId,
        token: &str,
        now: Timestamp,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET active_sessions = (
                SELECT jsonb_agg(
                    CASE WHEN e.s->>'token' = $2
                         THEN jsonb_set(e.s, '{{last_activity}}', $3)
                         ELSE e.s END
                    ORDER BY e.ord)
                FROM jsonb_array_elements(active_sessions) WITH ORDINALITY AS e(s, ord))
             WHERE id = $1
               AND active_sessions @> jsonb_build_array(jsonb_build_object('token', $2::text))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(token)
            .bind(Json(now))
            .fetch_optional(pool)
            .await
    }

    /// Store a password-reset token and its expiry.
    pub async fn set_reset_token(
        pool: &PgPool,
        id: DbId,
        token: &str,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expires = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find the user holding an unexpired reset token.
    pub async fn find_by_reset_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE reset_password_token = $1
               AND reset_password_expires > NOW()"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }
}
