//! Repository for surveys, their sections/questions, and responses.

use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::types::DbId;
use sqlx::PgPool;

use crate::models::status::StatusId;
use crate::models::survey::{
    AnswerInput, CreateSurvey, QuestionReport, SectionWithQuestions, Survey, SurveyDetail,
    SurveyQuestion, SurveyReport, SurveyResponse, SurveySection, UpdateSurvey,
};

const COLUMNS: &str = "id, title, description, status_id, created_by, created_at, updated_at";

pub struct SurveyRepo;

impl SurveyRepo {
    /// Insert a survey with its sections and questions in one transaction.
    /// Sort order follows the input order.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSurvey,
        created_by: DbId,
    ) -> Result<SurveyDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO surveys (title, description, created_by) VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let survey = sqlx::query_as::<_, Survey>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        let mut sections = Vec::with_capacity(input.sections.len());
        for (section_order, section_input) in input.sections.iter().enumerate() {
            let section = sqlx::query_as::<_, SurveySection>(
                "INSERT INTO survey_sections (survey_id, title, description, sort_order)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, survey_id, title, description, sort_order",
            )
            .bind(survey.id)
            .bind(&section_input.title)
            .bind(&section_input.description)
            .bind(section_order as i32)
            .fetch_one(&mut *tx)
            .await?;

            let mut questions = Vec::with_capacity(section_input.questions.len());
            for (question_order, q) in section_input.questions.iter().enumerate() {
                let question = sqlx::query_as::<_, SurveyQuestion>(
                    "INSERT INTO survey_questions (section_id, prompt, question_type, is_required, sort_order)
                     VALUES ($1, $2, $3, $4, $5)
                     RETURNING id, section_id, prompt, question_type, is_required, sort_order",
                )
                .bind(section.id)
                .bind(&q.prompt)
                .bind(&q.question_type)
                .bind(q.is_required)
                .bind(question_order as i32)
                .fetch_one(&mut *tx)
                .await?;
                questions.push(question);
            }
            sections.push(SectionWithQuestions { section, questions });
        }

        tx.commit().await?;
        Ok(SurveyDetail { survey, sections })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM surveys WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Survey with sections and questions in display order.
    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SurveyDetail>, sqlx::Error> {
        let Some(survey) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let sections = sqlx::query_as::<_, SurveySection>(
            "SELECT id, survey_id, title, description, sort_order
             FROM survey_sections WHERE survey_id = $1 ORDER BY sort_order, id",
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        let mut questions = Self::questions(pool, id).await?;
        let sections = sections
            .into_iter()
            .map(|section| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    questions.drain(..).partition(|q| q.section_id == section.id);
                questions = rest;
                SectionWithQuestions {
                    section,
                    questions: mine,
                }
            })
            .collect();

        Ok(Some(SurveyDetail { survey, sections }))
    }

    /// Every question of a survey, ordered by section then position.
    pub async fn questions(
        pool: &PgPool,
        survey_id: DbId,
    ) -> Result<Vec<SurveyQuestion>, sqlx::Error> {
        sqlx::query_as::<_, SurveyQuestion>(
            "SELECT q.id, q.section_id, q.prompt, q.question_type, q.is_required, q.sort_order
             FROM survey_questions q
             JOIN survey_sections s ON s.id = q.section_id
             WHERE s.survey_id = $1
             ORDER BY s.sort_order, s.id, q.sort_order, q.id",
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        status_id: Option<StatusId>,
        page: PageRequest,
    ) -> Result<Page<Survey>, sqlx::Error> {
        let conditions = "deleted_at IS NULL AND ($1::SMALLINT IS NULL OR status_id = $1)";
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM surveys WHERE {conditions}"))
                .bind(status_id)
                .fetch_one(pool)
                .await?;
        let query = format!(
            "SELECT {COLUMNS} FROM surveys WHERE {conditions}
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, Survey>(&query)
            .bind(status_id)
            .bind(page.size)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;
        Ok(page.wrap(items, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSurvey,
    ) -> Result<Option<Survey>, sqlx::Error> {
        let query = format!(
            "UPDATE surveys SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status_id = COALESCE($4, status_id)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Survey>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.status_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE surveys SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Store a response and its answers atomically. A second response from
    /// the same student for the same survey and schedule violates
    /// `uq_survey_responses_student`.
    pub async fn create_response(
        pool: &PgPool,
        survey_id: DbId,
        student_id: DbId,
        schedule_id: Option<DbId>,
        answers: &[AnswerInput],
    ) -> Result<SurveyResponse, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let response = sqlx::query_as::<_, SurveyResponse>(
            "INSERT INTO survey_responses (survey_id, student_id, schedule_id)
             VALUES ($1, $2, $3)
             RETURNING id, survey_id, student_id, schedule_id, submitted_at",
        )
        .bind(survey_id)
        .bind(student_id)
        .bind(schedule_id)
        .fetch_one(&mut *tx)
        .await?;

        for answer in answers {
            sqlx::query(
                "INSERT INTO survey_answers (response_id, question_id, rating, text_answer)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(response.id)
            .bind(answer.question_id)
            .bind(answer.rating)
            .bind(&answer.text_answer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(response)
    }

    /// Response count plus per-question answer counts and average rating.
    pub async fn report(pool: &PgPool, survey_id: DbId) -> Result<SurveyReport, sqlx::Error> {
        let response_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE survey_id = $1")
                .bind(survey_id)
                .fetch_one(pool)
                .await?;

        let questions = sqlx::query_as::<_, QuestionReport>(
            "SELECT q.id AS question_id, q.prompt, q.question_type,
                    COUNT(a.id) AS answer_count,
                    AVG(a.rating)::DOUBLE PRECISION AS average_rating
             FROM survey_questions q
             JOIN survey_sections s ON s.id = q.section_id
             LEFT JOIN survey_answers a ON a.question_id = q.id
             WHERE s.survey_id = $1
             GROUP BY q.id, q.prompt, q.question_type, s.sort_order, s.id, q.sort_order
             ORDER BY s.sort_order, s.id, q.sort_order, q.id",
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await?;

        Ok(SurveyReport {
            survey_id,
            response_count,
            questions,
        })
    }
}
