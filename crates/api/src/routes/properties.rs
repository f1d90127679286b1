//! Route definitions for the `/properties` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::properties;
use crate::state::AppState;

/// Routes mounted at `/properties`.
///
/// ```text
/// GET    /                              -> list_properties
/// POST   /                              -> create_property
/// GET    /{id}                          -> get_property
/// PUT    /{id}                          -> update_property (admin)
/// DELETE /{id}                          -> delete_property (admin)
/// POST   /{id}/pay                      -> record_payment
/// PUT    /{id}/payments/{payment_id}    -> edit_payment (admin)
/// DELETE /{id}/payments/{payment_id}    -> delete_payment (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(properties::list_properties).post(properties::create_property),
        )
        .route(
            "/{id}",
            get(properties::get_property)
                .put(properties::update_property)
                .delete(properties::delete_property),
        )
        .route("/{id}/pay", post(properties::record_payment))
        .route(
            "/{id}/payments/{payment_id}",
            put(properties::edit_payment).delete(properties::delete_payment),
        )
}
