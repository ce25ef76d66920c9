//! Route definitions for `/payments`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::payments;
use crate::state::AppState;

/// ```text
/// GET    /                 -> list_payments
/// POST   /                 -> create_payment
/// GET    /{id}             -> get_payment
/// PUT    /{id}             -> update_payment
/// DELETE /{id}             -> delete_payment
/// POST   /{id}/complete    -> complete_payment
/// POST   /{id}/fail        -> fail_payment
/// POST   /{id}/refund      -> refund_payment
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route(
            "/{id}",
            get(payments::get_payment)
                .put(payments::update_payment)
                .delete(payments::delete_payment),
        )
        .route("/{id}/complete", post(payments::complete_payment))
        .route("/{id}/fail", post(payments::fail_payment))
        .route("/{id}/refund", post(payments::refund_payment))
}
