//! Route definitions for `/carts`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::carts;
use crate::state::AppState;

/// ```text
/// GET    /{business_id}          -> get_cart
/// DELETE /{business_id}          -> clear_cart
/// POST   /{business_id}/items    -> add_item
/// PUT    /items/{item_id}        -> update_item (0 removes)
/// DELETE /items/{item_id}        -> remove_item
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{business_id}",
            get(carts::get_cart).delete(carts::clear_cart),
        )
        .route("/{business_id}/items", post(carts::add_item))
        .route(
            "/items/{item_id}",
            put(carts::update_item).delete(carts::remove_item),
        )
}
