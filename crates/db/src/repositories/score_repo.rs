//! Repository for score configuration, score sessions and student scores.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::scoring::ScoreWeights;
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::score::{
    ScoreConfiguration, ScoreSession, ScoreSessionFilter, StudentScore, TranscriptRow,
    UpdateStudentScore,
};
use crate::models::status::{ScoreSessionStatus, StatusId};

const CONFIG_COLUMNS: &str = "id, attendance_pct, assignment_pct, midterm_pct, final_pct, \
                              is_active, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, schedule_id, teacher_id, status_id, submission_date, \
                               teacher_comments, staff_comments, created_at, updated_at";

const SCORE_COLUMNS: &str = "id, score_session_id, student_id, attendance_score, \
                             assignment_score, midterm_score, final_score, comments, \
                             created_at, updated_at";

pub struct ScoreRepo;

impl ScoreRepo {
    pub async fn active_configuration(
        pool: &PgPool,
    ) -> Result<Option<ScoreConfiguration>, sqlx::Error> {
        let query = format!("SELECT {CONFIG_COLUMNS} FROM score_configurations WHERE is_active");
        sqlx::query_as::<_, ScoreConfiguration>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Retire the active configuration and install `weights` as the new one.
    pub async fn replace_configuration(
        pool: &PgPool,
        weights: &ScoreWeights,
    ) -> Result<ScoreConfiguration, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE score_configurations SET is_active = false WHERE is_active")
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO score_configurations (attendance_pct, assignment_pct, midterm_pct, final_pct)
             VALUES ($1, $2, $3, $4)
             RETURNING {CONFIG_COLUMNS}"
        );
        let config = sqlx::query_as::<_, ScoreConfiguration>(&query)
            .bind(weights.attendance)
            .bind(weights.assignment)
            .bind(weights.midterm)
            .bind(weights.final_exam)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(config)
    }

    pub async fn find_draft_for_schedule(
        pool: &PgPool,
        schedule_id: DbId,
    ) -> Result<Option<ScoreSession>, sqlx::Error> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM score_sessions WHERE schedule_id = $1 AND status_id = $2"
        );
        sqlx::query_as::<_, ScoreSession>(&query)
            .bind(schedule_id)
            .bind(ScoreSessionStatus::Draft.id())
            .fetch_optional(pool)
            .await
    }

    /// Create a DRAFT session with one score row per `(student_id, attendance_points)`.
    pub async fn create_session(
        pool: &PgPool,
        schedule_id: DbId,
        teacher_id: DbId,
        roster: &[(DbId, f64)],
    ) -> Result<ScoreSession, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO score_sessions (schedule_id, teacher_id) VALUES ($1, $2)
             RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, ScoreSession>(&query)
            .bind(schedule_id)
            .bind(teacher_id)
            .fetch_one(&mut *tx)
            .await?;

        Self::insert_scores(&mut tx, session.id, roster).await?;
        tx.commit().await?;
        Ok(session)
    }

    /// Add rows for students not yet present in the session. Returns how many were added.
    pub async fn add_missing_scores(
        pool: &PgPool,
        session_id: DbId,
        roster: &[(DbId, f64)],
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let added = Self::insert_scores(&mut tx, session_id, roster).await?;
        tx.commit().await?;
        Ok(added)
    }

    async fn insert_scores(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        session_id: DbId,
        roster: &[(DbId, f64)],
    ) -> Result<u64, sqlx::Error> {
        let (student_ids, points): (Vec<DbId>, Vec<f64>) = roster.iter().copied().unzip();
        let result = sqlx::query(
            "INSERT INTO student_scores (score_session_id, student_id, attendance_score)
             SELECT $1, t.student_id, t.points
             FROM UNNEST($2::BIGINT[], $3::DOUBLE PRECISION[]) AS t(student_id, points)
             ON CONFLICT (score_session_id, student_id) DO NOTHING",
        )
        .bind(session_id)
        .bind(&student_ids)
        .bind(&points)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_session(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ScoreSession>, sqlx::Error> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM score_sessions WHERE id = $1");
        sqlx::query_as::<_, ScoreSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn session_scores(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<StudentScore>, sqlx::Error> {
        let query = format!(
            "SELECT {SCORE_COLUMNS} FROM student_scores WHERE score_session_id = $1 ORDER BY student_id"
        );
        sqlx::query_as::<_, StudentScore>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_sessions(
        pool: &PgPool,
        filter: &ScoreSessionFilter,
        page: PageRequest,
    ) -> Result<Page<ScoreSession>, sqlx::Error> {
        let conditions = "($1::BIGINT IS NULL OR schedule_id = $1)
            AND ($2::SMALLINT IS NULL OR status_id = $2)
            AND ($3::BIGINT IS NULL OR teacher_id = $3)";
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM score_sessions WHERE {conditions}"
        ))
        .bind(filter.schedule_id)
        .bind(filter.status_id)
        .bind(filter.teacher_id)
        .fetch_one(pool)
        .await?;

        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM score_sessions WHERE {conditions}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let items = sqlx::query_as::<_, ScoreSession>(&query)
            .bind(filter.schedule_id)
            .bind(filter.status_id)
            .bind(filter.teacher_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    /// Update status and comments. Moving into SUBMITTED stamps `submission_date`.
    pub async fn update_session(
        pool: &PgPool,
        id: DbId,
        status_id: Option<StatusId>,
        teacher_comments: Option<&str>,
        staff_comments: Option<&str>,
    ) -> Result<Option<ScoreSession>, sqlx::Error> {
        let query = format!(
            "UPDATE score_sessions SET
                status_id = COALESCE($2, status_id),
                teacher_comments = COALESCE($3, teacher_comments),
                staff_comments = COALESCE($4, staff_comments),
                submission_date = CASE WHEN $2 = $5 AND status_id <> $5 THEN NOW()
                                       ELSE submission_date END
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, ScoreSession>(&query)
            .bind(id)
            .bind(status_id)
            .bind(teacher_comments)
            .bind(staff_comments)
            .bind(ScoreSessionStatus::Submitted.id())
            .fetch_optional(pool)
            .await
    }

    pub async fn find_score(pool: &PgPool, id: DbId) -> Result<Option<StudentScore>, sqlx::Error> {
        let query = format!("SELECT {SCORE_COLUMNS} FROM student_scores WHERE id = $1");
        sqlx::query_as::<_, StudentScore>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_score(
        pool: &PgPool,
        id: DbId,
        input: &UpdateStudentScore,
    ) -> Result<Option<StudentScore>, sqlx::Error> {
        let query = format!(
            "UPDATE student_scores SET
                attendance_score = COALESCE($2, attendance_score),
                assignment_score = COALESCE($3, assignment_score),
                midterm_score = COALESCE($4, midterm_score),
                final_score = COALESCE($5, final_score),
                comments = COALESCE($6, comments)
             WHERE id = $1
             RETURNING {SCORE_COLUMNS}"
        );
        sqlx::query_as::<_, StudentScore>(&query)
            .bind(id)
            .bind(input.attendance_score)
            .bind(input.assignment_score)
            .bind(input.midterm_score)
            .bind(input.final_score)
            .bind(&input.comments)
            .fetch_optional(pool)
            .await
    }

    /// A student's scores across courses, oldest course first. With
    /// `approved_only` only scores from APPROVED sessions are returned.
    pub async fn scores_for_student(
        pool: &PgPool,
        student_id: DbId,
        approved_only: bool,
    ) -> Result<Vec<TranscriptRow>, sqlx::Error> {
        sqlx::query_as::<_, TranscriptRow>(
            "SELECT sc.id, sc.score_session_id, sc.student_id, sc.attendance_score,
                    sc.assignment_score, sc.midterm_score, sc.final_score, sc.comments,
                    sc.created_at, sc.updated_at,
                    s.id AS schedule_id, s.course_name, s.credits
             FROM student_scores sc
             JOIN score_sessions ss ON ss.id = sc.score_session_id
             JOIN schedules s ON s.id = ss.schedule_id
             WHERE sc.student_id = $1 AND (NOT $2 OR ss.status_id = $3)
             ORDER BY ss.created_at, sc.id",
        )
        .bind(student_id)
        .bind(approved_only)
        .bind(ScoreSessionStatus::Approved.id())
        .fetch_all(pool)
        .await
    }
}
