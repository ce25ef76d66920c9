//! Score configuration, score session, and student score models.

use backoffice_core::scoring::{letter_grade, ScoreComponents, ScoreWeights};
use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `score_configurations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScoreConfiguration {
    pub id: DbId,
    pub attendance_pct: f64,
    pub assignment_pct: f64,
    pub midterm_pct: f64,
    pub final_pct: f64,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ScoreConfiguration {
    pub fn weights(&self) -> ScoreWeights {
        ScoreWeights {
            attendance: self.attendance_pct,
            assignment: self.assignment_pct,
            midterm: self.midterm_pct,
            final_exam: self.final_pct,
        }
    }
}

/// A row from the `score_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScoreSession {
    pub id: DbId,
    pub schedule_id: DbId,
    pub teacher_id: DbId,
    pub status_id: StatusId,
    pub submission_date: Option<Timestamp>,
    pub teacher_comments: Option<String>,
    pub staff_comments: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `student_scores` table.
#[derive(Debug, Clone, FromRow)]
pub struct StudentScore {
    pub id: DbId,
    pub score_session_id: DbId,
    pub student_id: DbId,
    pub attendance_score: f64,
    pub assignment_score: f64,
    pub midterm_score: f64,
    pub final_score: f64,
    pub comments: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StudentScore {
    pub fn components(&self) -> ScoreComponents {
        ScoreComponents {
            attendance: self.attendance_score,
            assignment: self.assignment_score,
            midterm: self.midterm_score,
            final_exam: self.final_score,
        }
    }
}

/// Student score with computed total and letter grade.
#[derive(Debug, Clone, Serialize)]
pub struct StudentScoreResponse {
    pub id: DbId,
    pub score_session_id: DbId,
    pub student_id: DbId,
    pub attendance_score: f64,
    pub assignment_score: f64,
    pub midterm_score: f64,
    pub final_score: f64,
    pub total_score: f64,
    pub grade: &'static str,
    pub comments: Option<String>,
    pub updated_at: Timestamp,
}

impl From<StudentScore> for StudentScoreResponse {
    fn from(score: StudentScore) -> Self {
        let total_score = score.components().total();
        Self {
            id: score.id,
            score_session_id: score.score_session_id,
            student_id: score.student_id,
            attendance_score: score.attendance_score,
            assignment_score: score.assignment_score,
            midterm_score: score.midterm_score,
            final_score: score.final_score,
            total_score,
            grade: letter_grade(total_score),
            comments: score.comments,
            updated_at: score.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreSessionWithScores {
    #[serde(flatten)]
    pub session: ScoreSession,
    pub scores: Vec<StudentScoreResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudentScore {
    pub attendance_score: Option<f64>,
    pub assignment_score: Option<f64>,
    pub midterm_score: Option<f64>,
    pub final_score: Option<f64>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreSessionFilter {
    pub schedule_id: Option<DbId>,
    pub status_id: Option<StatusId>,
    pub teacher_id: Option<DbId>,
}

/// Approved score joined with its course, for transcripts.
#[derive(Debug, Clone, FromRow)]
pub struct TranscriptRow {
    #[sqlx(flatten)]
    pub score: StudentScore,
    pub schedule_id: DbId,
    pub course_name: String,
    pub credits: i32,
}
