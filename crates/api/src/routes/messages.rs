//! Route definitions for `/message-threads`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::messages;
use crate::state::AppState;

/// ```text
/// GET    /                 -> list_threads (?business_id, unread_only)
/// POST   /                 -> create_thread
/// GET    /{id}             -> get_thread
/// DELETE /{id}             -> delete_thread (admin)
/// POST   /{id}/messages    -> add_message
/// POST   /{id}/read        -> mark_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(messages::list_threads).post(messages::create_thread),
        )
        .route(
            "/{id}",
            get(messages::get_thread).delete(messages::delete_thread),
        )
        .route("/{id}/messages", post(messages::add_message))
        .route("/{id}/read", post(messages::mark_read))
}
