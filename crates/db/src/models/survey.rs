//! Survey, section, question, and response models.

use backoffice_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `surveys` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Survey {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub status_id: StatusId,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveySection {
    pub id: DbId,
    pub survey_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyQuestion {
    pub id: DbId,
    pub section_id: DbId,
    pub prompt: String,
    pub question_type: String,
    pub is_required: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionWithQuestions {
    #[serde(flatten)]
    pub section: SurveySection,
    pub questions: Vec<SurveyQuestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub sections: Vec<SectionWithQuestions>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuestion {
    pub prompt: String,
    pub question_type: String,
    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSection {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<CreateQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSurvey {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<CreateSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSurvey {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status_id: Option<StatusId>,
}

/// A row from the `survey_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SurveyResponse {
    pub id: DbId,
    pub survey_id: DbId,
    pub student_id: DbId,
    pub schedule_id: Option<DbId>,
    pub submitted_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerInput {
    pub question_id: DbId,
    pub rating: Option<i32>,
    pub text_answer: Option<String>,
}

/// Aggregated answers for one question.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuestionReport {
    pub question_id: DbId,
    pub prompt: String,
    pub question_type: String,
    pub answer_count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyReport {
    pub survey_id: DbId,
    pub response_count: i64,
    pub questions: Vec<QuestionReport>,
}
