pub mod admin;
pub mod auth;
pub mod businesses;
pub mod carts;
pub mod health;
pub mod messages;
pub mod orders;
pub mod payments;
pub mod plans;
pub mod school;
pub mod subscriptions;
pub mod telegram;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth                     login, refresh, logout, me, register
/// /admin/users              user management (admin)
///
/// /businesses               restaurants, Telegram linking, analytics, menu
/// /subscription-plans       plan catalogue
/// /subscriptions            lifecycle, sweeps, bulk actions
/// /payments                 payment records and transitions
/// /carts                    customer carts
/// /orders                   checkout, POS, status machine
/// /message-threads          owner inbox
/// /telegram                 bot webhook, manual sends
///
/// /classes                  cohorts and rosters
/// /schedules                weekly course slots
/// /attendance-sessions      QR sessions
/// /attendance               scans, edits, percentages
/// /score-configuration      grading weights
/// /score-sessions           per-schedule grading
/// /student-scores           individual scores
/// /students/{id}/...        scores, transcript
/// /surveys                  feedback forms and reports
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
        // Restaurant SaaS.
        .nest("/businesses", businesses::router())
        .nest("/subscription-plans", plans::router())
        .nest("/subscriptions", subscriptions::router())
        .nest("/payments", payments::router())
        .nest("/carts", carts::router())
        .nest("/orders", orders::router())
        .nest("/message-threads", messages::router())
        .nest("/telegram", telegram::router())
        // School administration.
        .nest("/classes", school::classes_router())
        .nest("/schedules", school::schedules_router())
        .nest("/attendance-sessions", school::attendance_sessions_router())
        .nest("/attendance", school::attendance_router())
        .nest("/surveys", school::surveys_router())
        .merge(school::scoring_router())
}
