use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::question::{self, AnswerOption};
use crate::error::AppError;
use crate::services::question_parser::ParseWarning;

use super::shared::{double_option, validate_name};

/// Largest HTML document accepted for parsing, in bytes.
pub const MAX_HTML_BYTES: usize = 5 * 1024 * 1024;
/// Highest question number a set may hold.
pub const MAX_QUESTION_NUMBER: i32 = 100_000;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub set_id: Option<i32>,
    /// Case-insensitive substring of the question text.
    pub search: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateQuestionRequest {
    pub set_id: i32,
    /// Defaults to one past the highest number in the set.
    pub question_number: Option<i32>,
    pub section: Option<String>,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateQuestionRequest {
    pub question_number: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub section: Option<Option<String>>,
    pub question_text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: Option<AnswerOption>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub explanation: Option<Option<String>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionResponse {
    pub id: i32,
    pub set_id: i32,
    pub question_number: i32,
    pub section: Option<String>,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<question::Model> for QuestionResponse {
    fn from(m: question::Model) -> Self {
        Self {
            id: m.id,
            set_id: m.set_id,
            question_number: m.question_number,
            section: m.section,
            question_text: m.question_text,
            option_a: m.option_a,
            option_b: m.option_b,
            option_c: m.option_c,
            option_d: m.option_d,
            correct_answer: m.correct_answer,
            explanation: m.explanation,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn validate_text(field: &str, value: &str) -> Result<(), AppError> {
    validate_name(field, value, 2000)
}

pub fn validate_question_number(n: i32) -> Result<(), AppError> {
    if !(1..=MAX_QUESTION_NUMBER).contains(&n) {
        return Err(AppError::Validation(format!(
            "question_number must be between 1 and {MAX_QUESTION_NUMBER}"
        )));
    }
    Ok(())
}

pub fn validate_create_question(req: &CreateQuestionRequest) -> Result<(), AppError> {
    if let Some(n) = req.question_number {
        validate_question_number(n)?;
    }
    validate_text("question_text", &req.question_text)?;
    validate_text("option_a", &req.option_a)?;
    validate_text("option_b", &req.option_b)?;
    validate_text("option_c", &req.option_c)?;
    validate_text("option_d", &req.option_d)
}

pub fn validate_update_question(req: &UpdateQuestionRequest) -> Result<(), AppError> {
    if let Some(n) = req.question_number {
        validate_question_number(n)?;
    }
    for (field, value) in [
        ("question_text", &req.question_text),
        ("option_a", &req.option_a),
        ("option_b", &req.option_b),
        ("option_c", &req.option_c),
        ("option_d", &req.option_d),
    ] {
        if let Some(value) = value {
            validate_text(field, value)?;
        }
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ParseRequest {
    /// Pasted document HTML.
    pub html: String,
}

pub fn validate_html(html: &str) -> Result<(), AppError> {
    if html.trim().is_empty() {
        return Err(AppError::Validation("html is required".into()));
    }
    if html.len() > MAX_HTML_BYTES {
        return Err(AppError::Validation("html must be at most 5 MB".into()));
    }
    Ok(())
}

/// Import into an existing set (`set_id`) or a new one (`set_name`).
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ImportQuestionsRequest {
    pub html: String,
    pub set_id: Option<i32>,
    pub set_name: Option<String>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
    /// Drop the set's current questions first.
    #[serde(default)]
    pub replace: bool,
}

pub fn validate_import_target(set_id: Option<i32>, set_name: Option<&str>) -> Result<(), AppError> {
    match (set_id, set_name) {
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Provide either set_id or set_name, not both".into(),
        )),
        (None, None) => Err(AppError::Validation(
            "set_id or set_name is required".into(),
        )),
        (None, Some(name)) => validate_name("set_name", name, 200),
        (Some(_), None) => Ok(()),
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImportQuestionsResponse {
    pub set_id: i32,
    /// Whether the import created the set.
    pub created_set: bool,
    pub imported: usize,
    /// Questions that existed before and were removed (`replace = true`).
    pub replaced: u64,
    pub total_questions: i32,
    pub warnings: Vec<ParseWarning>,
}
