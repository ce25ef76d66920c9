//! Handlers for grading: the weight configuration, per-schedule score
//! sessions, individual student scores, and transcripts.
//!
//! Teachers fill in a DRAFT session and submit it; office staff approve or
//! reject. Only approved scores reach a transcript.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::attendance::attendance_percentage;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::roles::{ROLE_ADMIN, ROLE_STAFF, ROLE_STUDENT, ROLE_TEACHER};
use backoffice_core::scoring::{
    academic_standing, attendance_points, gpa, grade_points, is_passing, state_machine,
    ScoreComponents, ScoreWeights,
};
use backoffice_core::types::{DbId, Timestamp};
use backoffice_db::models::score::{
    ScoreConfiguration, ScoreSession, ScoreSessionFilter, ScoreSessionWithScores, StudentScore,
    StudentScoreResponse, UpdateStudentScore,
};
use backoffice_db::models::status::{ScoreSessionStatus, StatusId};
use backoffice_db::repositories::{AttendanceRepo, ScheduleRepo, ScoreRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireAuth, RequireStaff, RequireTeacher};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WeightsRequest {
    pub attendance: f64,
    pub assignment: f64,
    pub midterm: f64,
    #[serde(rename = "final")]
    pub final_exam: f64,
}

#[derive(Debug, Deserialize)]
pub struct InitSessionRequest {
    pub schedule_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct ScoreSessionListParams {
    pub schedule_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub teacher_id: Option<DbId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub status_id: Option<StatusId>,
    pub teacher_comments: Option<String>,
    pub staff_comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CourseScore {
    pub schedule_id: DbId,
    pub course_name: String,
    pub credits: i32,
    #[serde(flatten)]
    pub score: StudentScoreResponse,
}

#[derive(Debug, Serialize)]
pub struct TranscriptEntry {
    pub schedule_id: DbId,
    pub course_name: String,
    pub credits: i32,
    pub total_score: f64,
    pub grade: &'static str,
    pub grade_points: f64,
    pub passed: bool,
    pub updated_at: Timestamp,
}

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub student_id: DbId,
    pub courses: Vec<TranscriptEntry>,
    pub total_credits: i64,
    pub earned_credits: i64,
    pub gpa: f64,
    pub academic_standing: &'static str,
}

/// Active weights; the seeded default applies if none was ever stored.
async fn active_weights(state: &AppState) -> AppResult<ScoreWeights> {
    Ok(ScoreRepo::active_configuration(&state.pool)
        .await?
        .map(|c| c.weights())
        .unwrap_or_default())
}

fn ensure_owns_session(user: &AuthUser, session: &ScoreSession) -> AppResult<()> {
    if user.role == ROLE_TEACHER && session.teacher_id != user.user_id {
        return Err(AppError::forbidden("You do not own this score session"));
    }
    Ok(())
}

fn is_office(user: &AuthUser) -> bool {
    user.has_any_role(&[ROLE_ADMIN, ROLE_STAFF])
}

async fn load_session(state: &AppState, id: DbId) -> AppResult<ScoreSession> {
    ScoreRepo::find_session(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("ScoreSession", id))
}

async fn with_scores(state: &AppState, session: ScoreSession) -> AppResult<ScoreSessionWithScores> {
    let scores = ScoreRepo::session_scores(&state.pool, session.id)
        .await?
        .into_iter()
        .map(StudentScoreResponse::from)
        .collect();
    Ok(ScoreSessionWithScores { session, scores })
}

/// Load a score plus its session, refusing edits unless the session is DRAFT.
async fn editable_score(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
) -> AppResult<(StudentScore, ScoreSession)> {
    let score = ScoreRepo::find_score(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("StudentScore", id))?;
    let session = load_session(state, score.score_session_id).await?;
    ensure_owns_session(user, &session)?;
    if !state_machine::is_editable(session.status_id) {
        return Err(AppError::conflict(
            "Scores can only be changed while the session is in draft",
        ));
    }
    Ok((score, session))
}

/// GET /api/v1/score-configuration
pub async fn get_configuration(
    State(state): State<AppState>,
    RequireTeacher(_user): RequireTeacher,
) -> AppResult<Json<ScoreConfiguration>> {
    let config = ScoreRepo::active_configuration(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("No active score configuration".into()))?;
    Ok(Json(config))
}

/// PUT /api/v1/score-configuration
pub async fn update_configuration(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<WeightsRequest>,
) -> AppResult<Json<ScoreConfiguration>> {
    let weights = ScoreWeights {
        attendance: input.attendance,
        assignment: input.assignment,
        midterm: input.midterm,
        final_exam: input.final_exam,
    };
    weights.validate().map_err(AppError::validation)?;
    let config = ScoreRepo::replace_configuration(&state.pool, &weights).await?;
    tracing::info!(
        config_id = config.id,
        user_id = staff.user_id,
        ?weights,
        "Score weights replaced"
    );
    Ok(Json(config))
}

/// Every student of the schedule's class with their attendance points.
async fn roster_with_points(
    state: &AppState,
    class_id: DbId,
    schedule_id: DbId,
    weights: &ScoreWeights,
) -> AppResult<Vec<(DbId, f64)>> {
    let tallies = AttendanceRepo::tally_for_class(&state.pool, class_id, Some(schedule_id)).await?;
    Ok(tallies
        .into_iter()
        .map(|t| (t.student_id, attendance_points(weights.attendance, t.attended, t.total)))
        .collect())
}

/// POST /api/v1/score-sessions
///
/// Returns the schedule's DRAFT session, topping up rows for students who
/// joined the class since; otherwise creates it.
pub async fn init_session(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Json(input): Json<InitSessionRequest>,
) -> AppResult<(StatusCode, Json<ScoreSessionWithScores>)> {
    let schedule = ScheduleRepo::find_by_id(&state.pool, input.schedule_id)
        .await?
        .ok_or(AppError::not_found("Schedule", input.schedule_id))?;
    if user.role == ROLE_TEACHER && schedule.teacher_id != user.user_id {
        return Err(AppError::forbidden("You do not teach this schedule"));
    }

    let weights = active_weights(&state).await?;
    let roster = roster_with_points(&state, schedule.class_id, schedule.id, &weights).await?;

    if let Some(existing) = ScoreRepo::find_draft_for_schedule(&state.pool, schedule.id).await? {
        let added = ScoreRepo::add_missing_scores(&state.pool, existing.id, &roster).await?;
        if added > 0 {
            tracing::info!(session_id = existing.id, added, "Added missing student scores");
        }
        return Ok((StatusCode::OK, Json(with_scores(&state, existing).await?)));
    }

    let session =
        ScoreRepo::create_session(&state.pool, schedule.id, schedule.teacher_id, &roster).await?;
    tracing::info!(
        session_id = session.id,
        schedule_id = schedule.id,
        students = roster.len(),
        "Score session created"
    );
    Ok((StatusCode::CREATED, Json(with_scores(&state, session).await?)))
}

/// GET /api/v1/score-sessions
///
/// Teachers only see their own sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Query(params): Query<ScoreSessionListParams>,
) -> AppResult<Json<DataResponse<Page<ScoreSession>>>> {
    let teacher_id = if user.role == ROLE_TEACHER {
        Some(user.user_id)
    } else {
        params.teacher_id
    };
    let filter = ScoreSessionFilter {
        schedule_id: params.schedule_id,
        status_id: params.status_id,
        teacher_id,
    };
    let page = PageRequest::new(params.page, params.size);
    let sessions = ScoreRepo::list_sessions(&state.pool, &filter, page).await?;
    Ok(Json(DataResponse::new(sessions)))
}

/// GET /api/v1/score-sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<ScoreSessionWithScores>> {
    let session = load_session(&state, id).await?;
    ensure_owns_session(&user, &session)?;
    Ok(Json(with_scores(&state, session).await?))
}

/// PUT /api/v1/score-sessions/{id}
///
/// Teachers submit and reopen; approving, rejecting and staff comments
/// belong to the office.
pub async fn update_session(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSessionRequest>,
) -> AppResult<Json<ScoreSession>> {
    let session = load_session(&state, id).await?;
    ensure_owns_session(&user, &session)?;

    if let Some(to) = input.status_id {
        let target = ScoreSessionStatus::from_id(to)
            .ok_or_else(|| AppError::validation(format!("Invalid score session status id {to}")))?;
        state_machine::validate_transition(session.status_id, to).map_err(AppError::conflict)?;
        let office_only = matches!(
            target,
            ScoreSessionStatus::Approved | ScoreSessionStatus::Rejected
        );
        if office_only && to != session.status_id && !is_office(&user) {
            return Err(AppError::forbidden(
                "Only staff can approve or reject score sessions",
            ));
        }
    }
    if input.staff_comments.is_some() && !is_office(&user) {
        return Err(AppError::forbidden("Only staff can write staff comments"));
    }

    let updated = ScoreRepo::update_session(
        &state.pool,
        id,
        input.status_id,
        input.teacher_comments.as_deref(),
        input.staff_comments.as_deref(),
    )
    .await?
    .ok_or(AppError::not_found("ScoreSession", id))?;

    if updated.status_id != session.status_id {
        tracing::info!(
            session_id = id,
            from = session.status_id,
            to = updated.status_id,
            user_id = user.user_id,
            "Score session status changed"
        );
    }
    Ok(Json(updated))
}

/// GET /api/v1/student-scores/{id}
pub async fn get_score(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<StudentScoreResponse>> {
    let score = ScoreRepo::find_score(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("StudentScore", id))?;
    let own = user.role == ROLE_STUDENT && score.student_id == user.user_id;
    if !own && !user.is_school_staff() {
        return Err(AppError::forbidden("You cannot view this score"));
    }
    Ok(Json(score.into()))
}

/// PUT /api/v1/student-scores/{id}
///
/// Each component must stay within its weight from the active configuration.
pub async fn update_score(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStudentScore>,
) -> AppResult<Json<StudentScoreResponse>> {
    let (score, _session) = editable_score(&state, &user, id).await?;

    let current = score.components();
    let merged = ScoreComponents {
        attendance: input.attendance_score.unwrap_or(current.attendance),
        assignment: input.assignment_score.unwrap_or(current.assignment),
        midterm: input.midterm_score.unwrap_or(current.midterm),
        final_exam: input.final_score.unwrap_or(current.final_exam),
    };
    let weights = active_weights(&state).await?;
    merged.validate_against(&weights).map_err(AppError::validation)?;

    let updated = ScoreRepo::update_score(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("StudentScore", id))?;
    Ok(Json(updated.into()))
}

/// POST /api/v1/student-scores/{id}/recalculate-attendance
pub async fn recalculate_attendance(
    State(state): State<AppState>,
    RequireTeacher(user): RequireTeacher,
    Path(id): Path<DbId>,
) -> AppResult<Json<StudentScoreResponse>> {
    let (score, session) = editable_score(&state, &user, id).await?;
    let weights = active_weights(&state).await?;
    let tally = AttendanceRepo::tally_for_student(
        &state.pool,
        score.student_id,
        Some(session.schedule_id),
        None,
        None,
    )
    .await?;
    let points = attendance_points(weights.attendance, tally.attended, tally.total);

    let updated = ScoreRepo::update_score(
        &state.pool,
        id,
        &UpdateStudentScore {
            attendance_score: Some(points),
            ..Default::default()
        },
    )
    .await?
    .ok_or(AppError::not_found("StudentScore", id))?;

    tracing::debug!(
        score_id = id,
        attendance_pct = attendance_percentage(tally.attended, tally.total),
        points,
        "Attendance points recalculated"
    );
    Ok(Json(updated.into()))
}

fn ensure_can_read_student(user: &AuthUser, student_id: DbId) -> AppResult<()> {
    if user.is_school_staff() || (user.role == ROLE_STUDENT && user.user_id == student_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("You cannot view this student's scores"))
    }
}

/// GET /api/v1/students/{id}/scores
///
/// Students only see scores that have been approved.
pub async fn student_scores(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<CourseScore>>>> {
    ensure_can_read_student(&user, student_id)?;
    let approved_only = !user.is_school_staff();
    let rows = ScoreRepo::scores_for_student(&state.pool, student_id, approved_only)
        .await?
        .into_iter()
        .map(|row| CourseScore {
            schedule_id: row.schedule_id,
            course_name: row.course_name,
            credits: row.credits,
            score: row.score.into(),
        })
        .collect();
    Ok(Json(DataResponse::new(rows)))
}

/// GET /api/v1/students/{id}/transcript
pub async fn transcript(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Transcript>>> {
    ensure_can_read_student(&user, student_id)?;
    let rows = ScoreRepo::scores_for_student(&state.pool, student_id, true).await?;

    let courses: Vec<TranscriptEntry> = rows
        .into_iter()
        .map(|row| {
            let response = StudentScoreResponse::from(row.score);
            TranscriptEntry {
                schedule_id: row.schedule_id,
                course_name: row.course_name,
                credits: row.credits,
                total_score: response.total_score,
                grade: response.grade,
                grade_points: grade_points(response.grade),
                passed: is_passing(response.grade),
                updated_at: response.updated_at,
            }
        })
        .collect();

    let total_credits = courses.iter().map(|c| i64::from(c.credits)).sum();
    let earned_credits = courses
        .iter()
        .filter(|c| c.passed)
        .map(|c| i64::from(c.credits))
        .sum();
    let gpa = gpa(courses.iter().map(|c| (c.grade_points, c.credits)));

    Ok(Json(DataResponse::new(Transcript {
        student_id,
        courses,
        total_credits,
        earned_credits,
        gpa,
        academic_standing: academic_standing(gpa),
    })))
}
