//! Route definitions for the `/auth` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// GET    /setup-status            -> setup_status
/// POST   /register                -> register
/// POST   /login                   -> login
/// POST   /logout                  -> logout
/// GET    /me                      -> me
/// POST   /verify-password         -> verify_own_password
/// POST   /forgot-password         -> forgot_password
/// POST   /reset-password/{token}  -> reset_password
/// GET    /users                   -> list_users (admin)
/// POST   /add-user                -> add_user (admin)
/// PUT    /users/{id}              -> update_user (admin)
/// DELETE /users/{id}              -> delete_user (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/setup-status", get(auth::setup_status))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/verify-password", post(auth::verify_own_password))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/{token}", post(auth::reset_password))
        .route("/users", get(auth::list_users))
        .route("/add-user", post(auth::add_user))
        .route(
            "/users/{id}",
            put(auth::update_user).delete(auth::delete_user),
        )
}
