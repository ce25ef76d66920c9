//! Route definitions for `/orders`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::orders;
use crate::state::AppState;

/// ```text
/// GET  /               -> list_orders
/// POST /checkout       -> checkout
/// POST /pos            -> create_pos_order
/// GET  /{id}           -> get_order
/// POST /{id}/status    -> change_status
/// POST /{id}/cancel    -> cancel_order
/// POST /{id}/paid      -> mark_paid
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders))
        .route("/checkout", post(orders::checkout))
        .route("/pos", post(orders::create_pos_order))
        .route("/{id}", get(orders::get_order))
        .route("/{id}/status", post(orders::change_status))
        .route("/{id}/cancel", post(orders::cancel_order))
        .route("/{id}/paid", post(orders::mark_paid))
}
