pub mod auth;
pub mod health;
pub mod properties;
pub mod rents;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                           WebSocket (notification relay)
///
/// /auth/setup-status                            first-run check (public)
/// /auth/register                                first admin (public, once)
/// /auth/login                                   login (public)
/// /auth/logout                                  logout (bearer optional)
/// /auth/me                                      current profile
/// /auth/verify-password                         re-confirm own password
/// /auth/forgot-password                         admin recovery (public)
/// /auth/reset-password/{token}                  set new password (public)
/// /auth/users                                   list (admin)
/// /auth/add-user                                create (admin)
/// /auth/users/{id}                              update, delete (admin)
///
/// /properties                                   list, create
/// /properties/{id}                              get, update (admin), delete (admin)
/// /properties/{id}/pay                          record payment
/// /properties/{id}/payments/{payment_id}        edit, delete payment (admin)
///
/// /rents                                        list, create
/// /rents/{id}                                   get, update (admin), delete (admin)
/// /rents/{id}/pay                               record payment
/// /rents/{id}/payments/{payment_id}             edit, delete payment (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/properties", properties::router())
        .nest("/rents", rents::router())
}
