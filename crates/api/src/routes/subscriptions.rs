//! Route definitions for `/subscriptions`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::subscriptions as subs;
use crate::state::AppState;

/// ```text
/// GET    /                     -> list_subscriptions
/// POST   /                     -> create_subscription
/// GET    /expiring             -> expiring (?days=7)
/// GET    /expired              -> expired
/// POST   /process-expired      -> process_expired
/// POST   /bulk                 -> bulk
/// GET    /{id}                 -> get_subscription
/// PUT    /{id}                 -> update_subscription
/// DELETE /{id}                 -> delete_subscription
/// POST   /{id}/renew           -> renew_subscription
/// POST   /{id}/cancel          -> cancel_subscription
/// POST   /{id}/suspend         -> suspend_subscription
/// POST   /{id}/reactivate      -> reactivate_subscription
/// POST   /{id}/extend          -> extend_subscription
/// POST   /{id}/change-plan     -> change_plan
/// GET    /{id}/usage           -> usage
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(subs::list_subscriptions).post(subs::create_subscription),
        )
        .route("/expiring", get(subs::expiring))
        .route("/expired", get(subs::expired))
        .route("/process-expired", post(subs::process_expired))
        .route("/bulk", post(subs::bulk))
        .route(
            "/{id}",
            get(subs::get_subscription)
                .put(subs::update_subscription)
                .delete(subs::delete_subscription),
        )
        .route("/{id}/renew", post(subs::renew_subscription))
        .route("/{id}/cancel", post(subs::cancel_subscription))
        .route("/{id}/suspend", post(subs::suspend_subscription))
        .route("/{id}/reactivate", post(subs::reactivate_subscription))
        .route("/{id}/extend", post(subs::extend_subscription))
        .route("/{id}/change-plan", post(subs::change_plan))
        .route("/{id}/usage", get(subs::usage))
}
