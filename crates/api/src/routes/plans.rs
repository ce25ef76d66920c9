//! Route definitions for `/subscription-plans`.

use axum::routing::get;
use axum::Router;

use crate::handlers::plans;
use crate::state::AppState;

/// ```text
/// GET    /          -> list_plans (admin)
/// POST   /          -> create_plan
/// GET    /public    -> list_public_plans (any authenticated user)
/// GET    /{id}      -> get_plan
/// PUT    /{id}      -> update_plan
/// DELETE /{id}      -> delete_plan
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(plans::list_plans).post(plans::create_plan))
        .route("/public", get(plans::list_public_plans))
        .route(
            "/{id}",
            get(plans::get_plan)
                .put(plans::update_plan)
                .delete(plans::delete_plan),
        )
}
