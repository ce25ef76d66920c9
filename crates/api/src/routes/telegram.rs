//! Route definitions for `/telegram`.

use axum::routing::post;
use axum::Router;

use crate::handlers::telegram;
use crate::state::AppState;

/// ```text
/// POST /webhook    -> webhook (public, secret header when configured)
/// POST /send       -> send_message (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(telegram::webhook))
        .route("/send", post(telegram::send_message))
}
