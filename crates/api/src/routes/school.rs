//! Route definitions for the school back office: classes, schedules,
//! attendance, scoring and surveys.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{attendance, classes, schedules, scoring, surveys};
use crate::state::AppState;

/// Mounted at `/classes`.
///
/// ```text
/// GET    /                 -> list_classes
/// POST   /                 -> create_class
/// GET    /{id}             -> get_class
/// PUT    /{id}             -> update_class
/// DELETE /{id}             -> delete_class
/// GET    /{id}/students    -> list_students
/// ```
pub fn classes_router() -> Router<AppState> {
    Router::new()
        .route("/", get(classes::list_classes).post(classes::create_class))
        .route(
            "/{id}",
            get(classes::get_class)
                .put(classes::update_class)
                .delete(classes::delete_class),
        )
        .route("/{id}/students", get(classes::list_students))
}

/// Mounted at `/schedules`.
pub fn schedules_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(schedules::list_schedules).post(schedules::create_schedule),
        )
        .route(
            "/{id}",
            get(schedules::get_schedule)
                .put(schedules::update_schedule)
                .delete(schedules::delete_schedule),
        )
}

/// Mounted at `/attendance-sessions`.
///
/// ```text
/// GET  /                      -> list_sessions
/// POST /                      -> open_session
/// GET  /{id}                  -> get_session
/// POST /{id}/regenerate-qr    -> regenerate_qr
/// POST /{id}/finalize         -> finalize_session
/// ```
pub fn attendance_sessions_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(attendance::list_sessions).post(attendance::open_session),
        )
        .route("/{id}", get(attendance::get_session))
        .route("/{id}/regenerate-qr", post(attendance::regenerate_qr))
        .route("/{id}/finalize", post(attendance::finalize_session))
}

/// Mounted at `/attendance`.
///
/// ```text
/// GET  /                            -> list_attendance
/// POST /scan                        -> scan (student)
/// PUT  /{id}                        -> update_attendance
/// GET  /students/{id}/percentage    -> student_percentage
/// GET  /students/{id}/report        -> student_report
/// GET  /classes/{id}/report         -> class_report
/// ```
pub fn attendance_router() -> Router<AppState> {
    Router::new()
        .route("/", get(attendance::list_attendance))
        .route("/scan", post(attendance::scan))
        .route("/{id}", put(attendance::update_attendance))
        .route(
            "/students/{id}/percentage",
            get(attendance::student_percentage),
        )
        .route("/students/{id}/report", get(attendance::student_report))
        .route("/classes/{id}/report", get(attendance::class_report))
}

/// Scoring routes, merged at the `/api/v1` root because they span several
/// resources.
///
/// ```text
/// GET  /score-configuration                             -> get_configuration
/// PUT  /score-configuration                             -> update_configuration
/// GET  /score-sessions                                  -> list_sessions
/// POST /score-sessions                                  -> init_session
/// GET  /score-sessions/{id}                             -> get_session
/// PUT  /score-sessions/{id}                             -> update_session
/// GET  /student-scores/{id}                             -> get_score
/// PUT  /student-scores/{id}                             -> update_score
/// POST /student-scores/{id}/recalculate-attendance      -> recalculate_attendance
/// GET  /students/{id}/scores                            -> student_scores
/// GET  /students/{id}/transcript                        -> transcript
/// ```
pub fn scoring_router() -> Router<AppState> {
    Router::new()
        .route(
            "/score-configuration",
            get(scoring::get_configuration).put(scoring::update_configuration),
        )
        .route(
            "/score-sessions",
            get(scoring::list_sessions).post(scoring::init_session),
        )
        .route(
            "/score-sessions/{id}",
            get(scoring::get_session).put(scoring::update_session),
        )
        .route(
            "/student-scores/{id}",
            get(scoring::get_score).put(scoring::update_score),
        )
        .route(
            "/student-scores/{id}/recalculate-attendance",
            post(scoring::recalculate_attendance),
        )
        .route("/students/{id}/scores", get(scoring::student_scores))
        .route("/students/{id}/transcript", get(scoring::transcript))
}

/// Mounted at `/surveys`.
///
/// ```text
/// GET    /                  -> list_surveys
/// POST   /                  -> create_survey (staff)
/// GET    /{id}              -> get_survey
/// PUT    /{id}              -> update_survey
/// DELETE /{id}              -> delete_survey
/// POST   /{id}/responses    -> submit_response (student)
/// GET    /{id}/report       -> survey_report
/// ```
pub fn surveys_router() -> Router<AppState> {
    Router::new()
        .route("/", get(surveys::list_surveys).post(surveys::create_survey))
        .route(
            "/{id}",
            get(surveys::get_survey)
                .put(surveys::update_survey)
                .delete(surveys::delete_survey),
        )
        .route("/{id}/responses", post(surveys::submit_response))
        .route("/{id}/report", get(surveys::survey_report))
}
