//! HTTP error mapping.
//!
//! Every failure leaves the server as JSON `{ "error": <message>, "code": <CODE> }`.
//! The one exception is a refused login, which also carries `session_info`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use estate_core::error::CoreError;
use estate_core::session::SessionInfo;
use serde::Serialize;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";
/// Postgres SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

const INTERNAL_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request body failed its `validator` rules.
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Correct credentials, but a live session blocks a non-forced login.
    #[error("Account already logged in on another device")]
    SessionConflict(SessionInfo),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_info: Option<&'a SessionInfo>,
}

struct Mapped {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Mapped {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 500 with a fixed message; the detail goes to the log only.
    fn internal(detail: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Request failed with an internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", INTERNAL_MESSAGE)
    }
}

fn map_core(err: &CoreError) -> Mapped {
    match err {
        CoreError::NotFound { entity, id } => Mapped::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => Mapped::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
        // The login screen shows these messages verbatim, so they stay 400.
        CoreError::InvalidCredentials(msg) => {
            Mapped::new(StatusCode::BAD_REQUEST, "INVALID_CREDENTIALS", msg)
        }
        CoreError::Conflict(msg) => Mapped::new(StatusCode::CONFLICT, "CONFLICT", msg),
        CoreError::Unauthorized(msg) => Mapped::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
        CoreError::Forbidden(msg) => Mapped::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg),
        CoreError::Internal(msg) => Mapped::internal(msg),
    }
}

/// Constraint-level failures become client errors; everything else is a 500.
fn map_sqlx(err: &sqlx::Error) -> Mapped {
    let sqlx::Error::Database(db_err) = err else {
        return match err {
            sqlx::Error::RowNotFound => {
                Mapped::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found")
            }
            other => Mapped::internal(other),
        };
    };

    let constraint = db_err.constraint().unwrap_or_default();
    match db_err.code().as_deref() {
        Some(UNIQUE_VIOLATION) if constraint.starts_with("uq_") => {
            Mapped::new(StatusCode::CONFLICT, "CONFLICT", duplicate_message(constraint))
        }
        Some(CHECK_VIOLATION) if constraint.starts_with("ck_") => Mapped::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            format!("Value rejected by constraint {constraint}"),
        ),
        _ => Mapped::internal(db_err),
    }
}

fn duplicate_message(constraint: &str) -> String {
    match constraint {
        "uq_users_email" => "A user with this email already exists".to_string(),
        "uq_users_cnic" => "A user with this CNIC already exists".to_string(),
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}

/// Field errors as one sorted sentence: `"email: Must be a valid email address; name: ..."`.
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reasons = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => e.code.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{field}: {reasons}")
        })
        .collect();
    fields.sort();
    fields.join("; ")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mapped = match &self {
            AppError::Core(core) => map_core(core),
            AppError::Database(err) => map_sqlx(err),
            AppError::Validation(errors) => Mapped::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format_validation_errors(errors),
            ),
            AppError::BadRequest(msg) => Mapped::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::InternalError(msg) => Mapped::internal(msg),
            AppError::SessionConflict(_) => Mapped::new(
                StatusCode::CONFLICT,
                "ALREADY_LOGGED_IN",
                "This account is already logged in on another device.",
            ),
        };

        let session_info = match &self {
            AppError::SessionConflict(info) => Some(info),
            _ => None,
        };
        let body = ErrorBody {
            error: mapped.message,
            code: mapped.code,
            session_info,
        };
        (mapped.status, Json(body)).into_response()
    }
}
