//! Route definitions for the `/rents` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::rents;
use crate::state::AppState;

/// Routes mounted at `/rents`.
///
/// ```text
/// GET    /                              -> list_rents
/// POST   /                              -> create_rent
/// GET    /{id}                          -> get_rent
/// PUT    /{id}                          -> update_rent (admin)
/// DELETE /{id}                          -> delete_rent (admin)
/// POST   /{id}/pay                      -> record_payment
/// PUT    /{id}/payments/{payment_id}    -> edit_payment (admin)
/// DELETE /{id}/payments/{payment_id}    -> delete_payment (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rents::list_rents).post(rents::create_rent))
        .route(
            "/{id}",
            get(rents::get_rent)
                .put(rents::update_rent)
                .delete(rents::delete_rent),
        )
        .route("/{id}/pay", post(rents::record_payment))
        .route(
            "/{id}/payments/{payment_id}",
            put(rents::edit_payment).delete(rents::delete_payment),
        )
}
