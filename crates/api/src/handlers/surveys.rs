//! Handlers for `/surveys`: course feedback forms built by office staff
//! and answered by students.

use std::collections::{HashMap, HashSet};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::pagination::{Page, PageRequest};
use backoffice_core::roles::ROLE_STUDENT;
use backoffice_core::survey::{missing_required, validate_answer, validate_question_type};
use backoffice_core::types::DbId;
use backoffice_db::models::status::{StatusId, SurveyStatus};
use backoffice_db::models::survey::{
    AnswerInput, CreateSurvey, Survey, SurveyDetail, SurveyReport, SurveyResponse, UpdateSurvey,
};
use backoffice_db::repositories::{ScheduleRepo, SurveyRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireStaff, RequireStudent};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSurveyRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub status_id: Option<StatusId>,
}

#[derive(Debug, Deserialize)]
pub struct SurveyListParams {
    pub status_id: Option<StatusId>,
    pub page: Option<i64>,
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    pub schedule_id: Option<DbId>,
    pub answers: Vec<AnswerInput>,
}

/// Trim and upper-case the form, rejecting blank titles, blank prompts and
/// unknown question types.
fn normalize_survey(mut input: CreateSurvey) -> AppResult<CreateSurvey> {
    input.title = input.title.trim().to_string();
    if input.title.is_empty() {
        return Err(AppError::validation("Survey title is required"));
    }
    for section in &mut input.sections {
        section.title = section.title.trim().to_string();
        if section.title.is_empty() {
            return Err(AppError::validation("Section title is required"));
        }
        for question in &mut section.questions {
            question.prompt = question.prompt.trim().to_string();
            if question.prompt.is_empty() {
                return Err(AppError::validation("Question prompt is required"));
            }
            question.question_type = question.question_type.trim().to_ascii_uppercase();
            validate_question_type(&question.question_type).map_err(AppError::validation)?;
        }
    }
    Ok(input)
}

/// POST /api/v1/surveys
pub async fn create_survey(
    State(state): State<AppState>,
    RequireStaff(staff): RequireStaff,
    Json(input): Json<CreateSurvey>,
) -> AppResult<(StatusCode, Json<SurveyDetail>)> {
    let input = normalize_survey(input)?;
    let survey = SurveyRepo::create(&state.pool, &input, staff.user_id).await?;
    tracing::info!(
        survey_id = survey.survey.id,
        sections = survey.sections.len(),
        "Survey created"
    );
    Ok((StatusCode::CREATED, Json(survey)))
}

/// GET /api/v1/surveys
///
/// Students only see active surveys.
pub async fn list_surveys(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(params): Query<SurveyListParams>,
) -> AppResult<Json<DataResponse<Page<Survey>>>> {
    let status_id = if user.role == ROLE_STUDENT {
        Some(SurveyStatus::Active.id())
    } else {
        params.status_id
    };
    let page = PageRequest::new(params.page, params.size);
    let surveys = SurveyRepo::list(&state.pool, status_id, page).await?;
    Ok(Json(DataResponse::new(surveys)))
}

/// GET /api/v1/surveys/{id}
pub async fn get_survey(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<SurveyDetail>> {
    let detail = SurveyRepo::find_detail(&state.pool, id)
        .await?
        .filter(|d| user.role != ROLE_STUDENT || d.survey.status_id == SurveyStatus::Active.id())
        .ok_or(AppError::not_found("Survey", id))?;
    Ok(Json(detail))
}

/// PUT /api/v1/surveys/{id}
pub async fn update_survey(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateSurveyRequest>,
) -> AppResult<Json<Survey>> {
    input.validate()?;
    if let Some(status_id) = input.status_id {
        if SurveyStatus::from_id(status_id).is_none() {
            return Err(AppError::validation(format!(
                "Invalid survey status id {status_id}"
            )));
        }
    }
    let survey = SurveyRepo::update(
        &state.pool,
        id,
        &UpdateSurvey {
            title: input.title.map(|t| t.trim().to_string()),
            description: input.description,
            status_id: input.status_id,
        },
    )
    .await?
    .ok_or(AppError::not_found("Survey", id))?;
    Ok(Json(survey))
}

/// DELETE /api/v1/surveys/{id}
pub async fn delete_survey(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !SurveyRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Survey", id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/surveys/{id}/responses
///
/// A second response for the same survey and schedule is a 409 from the
/// unique index.
pub async fn submit_response(
    State(state): State<AppState>,
    RequireStudent(student): RequireStudent,
    Path(id): Path<DbId>,
    Json(input): Json<SubmitResponseRequest>,
) -> AppResult<(StatusCode, Json<SurveyResponse>)> {
    let survey = SurveyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Survey", id))?;
    if survey.status_id != SurveyStatus::Active.id() {
        return Err(AppError::validation("Survey is not accepting responses"));
    }
    if let Some(schedule_id) = input.schedule_id {
        ScheduleRepo::find_by_id(&state.pool, schedule_id)
            .await?
            .ok_or(AppError::not_found("Schedule", schedule_id))?;
    }

    let questions = SurveyRepo::questions(&state.pool, id).await?;
    let types: HashMap<DbId, &str> = questions
        .iter()
        .map(|q| (q.id, q.question_type.as_str()))
        .collect();

    let mut seen = HashSet::new();
    for answer in &input.answers {
        let question_type = types.get(&answer.question_id).ok_or_else(|| {
            AppError::validation(format!(
                "Question {} does not belong to this survey",
                answer.question_id
            ))
        })?;
        if !seen.insert(answer.question_id) {
            return Err(AppError::validation(format!(
                "Question {} answered more than once",
                answer.question_id
            )));
        }
        validate_answer(question_type, answer.rating, answer.text_answer.as_deref())
            .map_err(|e| AppError::validation(format!("Question {}: {e}", answer.question_id)))?;
    }

    let required: Vec<DbId> = questions.iter().filter(|q| q.is_required).map(|q| q.id).collect();
    let answered: Vec<DbId> = input.answers.iter().map(|a| a.question_id).collect();
    let missing = missing_required(&required, &answered);
    if !missing.is_empty() {
        let ids: Vec<String> = missing.iter().map(DbId::to_string).collect();
        return Err(AppError::validation(format!(
            "Required questions not answered: {}",
            ids.join(", ")
        )));
    }

    let response = SurveyRepo::create_response(
        &state.pool,
        id,
        student.user_id,
        input.schedule_id,
        &input.answers,
    )
    .await?;
    tracing::info!(survey_id = id, response_id = response.id, "Survey response recorded");
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/surveys/{id}/report
pub async fn survey_report(
    State(state): State<AppState>,
    RequireStaff(_staff): RequireStaff,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<SurveyReport>>> {
    SurveyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Survey", id))?;
    let report = SurveyRepo::report(&state.pool, id).await?;
    Ok(Json(DataResponse::new(report)))
}
