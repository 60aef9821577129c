use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::question::{self, AnswerOption};
use crate::entity::{exam_category, question_set, training_record};
use crate::error::AppError;

use super::shared::{double_option, validate_name};

// ---- categories ----

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCategoryRequest {
    #[schema(example = "安全生产")]
    pub name: String,
    pub icon: Option<String>,
    #[schema(example = "#1677ff")]
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    pub sort_order: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub sort_order: i32,
    /// Number of question sets in this category.
    pub set_count: u64,
    pub created_at: DateTime<Utc>,
}

impl CategoryResponse {
    pub fn from_model(m: exam_category::Model, set_count: u64) -> Self {
        Self {
            id: m.id,
            name: m.name,
            icon: m.icon,
            color: m.color,
            sort_order: m.sort_order,
            set_count,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_category(req: &CreateCategoryRequest) -> Result<(), AppError> {
    validate_name("name", &req.name, 50)
}

pub fn validate_update_category(req: &UpdateCategoryRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name("name", name, 50)?;
    }
    Ok(())
}

// ---- question sets ----

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSetRequest {
    #[schema(example = "2024年度安全培训")]
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateSetRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SetListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category_id: Option<i32>,
    /// Only return active sets.
    pub active_only: Option<bool>,
}

#[derive(Debug, Serialize, PartialEq, utoipa::ToSchema)]
pub struct SetResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub total_questions: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<question_set::Model> for SetResponse {
    fn from(m: question_set::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            category_id: m.category_id,
            total_questions: m.total_questions,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_set(req: &CreateSetRequest) -> Result<(), AppError> {
    validate_name("name", &req.name, 200)
}

pub fn validate_update_set(req: &UpdateSetRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name("name", name, 200)?;
    }
    Ok(())
}

/// A question as shown to an examinee: no answer, no explanation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ExamQuestion {
    pub id: i32,
    pub question_number: i32,
    pub section: Option<String>,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
}

impl From<question::Model> for ExamQuestion {
    fn from(m: question::Model) -> Self {
        Self {
            id: m.id,
            question_number: m.question_number,
            section: m.section,
            question_text: m.question_text,
            option_a: m.option_a,
            option_b: m.option_b,
            option_c: m.option_c,
            option_d: m.option_d,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ExamResponse {
    pub set: SetResponse,
    pub questions: Vec<ExamQuestion>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetStatsResponse {
    pub set_id: i32,
    pub attempts: u64,
    /// Mean score rounded to one decimal place.
    pub average_score: f64,
    pub max_score: i32,
    pub min_score: i32,
    pub pass_score: i32,
    pub pass_count: u64,
    /// Share of passing attempts, 0-100, one decimal place.
    pub pass_rate: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl SetStatsResponse {
    /// Summarise the scores of every attempt at a set.
    pub fn from_scores(set_id: i32, scores: &[i32], pass_score: i32) -> Self {
        let attempts = scores.len() as u64;
        let pass_count = scores.iter().filter(|&&s| s >= pass_score).count() as u64;
        let (average_score, pass_rate) = if attempts == 0 {
            (0.0, 0.0)
        } else {
            let sum: i64 = scores.iter().map(|&s| i64::from(s)).sum();
            (
                round1(sum as f64 / attempts as f64),
                round1(pass_count as f64 * 100.0 / attempts as f64),
            )
        };

        Self {
            set_id,
            attempts,
            average_score,
            max_score: scores.iter().copied().max().unwrap_or(0),
            min_score: scores.iter().copied().min().unwrap_or(0),
            pass_score,
            pass_count,
            pass_rate,
        }
    }
}

// ---- training records ----

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitRecordRequest {
    #[schema(example = "张三")]
    pub employee_name: String,
    pub set_id: i32,
    /// Question id -> selected letter.
    #[schema(value_type = Object, example = json!({"12": "B", "13": "a"}))]
    pub answers: BTreeMap<i32, String>,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct QuestionResult {
    pub question_id: i32,
    pub question_number: i32,
    /// `None` when unanswered or not a valid letter.
    pub selected: Option<AnswerOption>,
    pub correct_answer: AnswerOption,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub total: i32,
    pub correct: i32,
    pub score: i32,
    pub results: Vec<QuestionResult>,
}

/// `round(correct * 100 / total)`, 0 for an empty set.
pub fn score_percent(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    (f64::from(correct) * 100.0 / f64::from(total)).round() as i32
}

/// Grade `answers` against the questions of a set, in question order.
pub fn grade(questions: &[question::Model], answers: &BTreeMap<i32, String>) -> Grade {
    let results: Vec<QuestionResult> = questions
        .iter()
        .map(|q| {
            let selected = answers
                .get(&q.id)
                .and_then(|a| a.parse::<AnswerOption>().ok());
            QuestionResult {
                question_id: q.id,
                question_number: q.question_number,
                selected,
                correct_answer: q.correct_answer,
                is_correct: selected == Some(q.correct_answer),
                explanation: q.explanation.clone(),
            }
        })
        .collect();

    let total = results.len() as i32;
    let correct = results.iter().filter(|r| r.is_correct).count() as i32;
    Grade {
        total,
        correct,
        score: score_percent(correct, total),
        results,
    }
}

pub fn validate_submit_record(req: &SubmitRecordRequest) -> Result<(), AppError> {
    validate_name("employee_name", &req.employee_name, 50)?;
    if req.answers.len() > 1000 {
        return Err(AppError::Validation("Too many answers".into()));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRecordResponse {
    pub record_id: i32,
    pub score: i32,
    pub total_questions: i32,
    pub correct_count: i32,
    pub passed: bool,
    pub results: Vec<QuestionResult>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Substring match on the employee name.
    pub employee_name: Option<String>,
    pub set_id: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordResponse {
    pub id: i32,
    pub employee_name: String,
    pub set_id: i32,
    pub score: i32,
    pub total_questions: i32,
    pub correct_count: i32,
    #[schema(value_type = Object)]
    pub answers: serde_json::Value,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<training_record::Model> for RecordResponse {
    fn from(m: training_record::Model) -> Self {
        Self {
            id: m.id,
            employee_name: m.employee_name,
            set_id: m.set_id,
            score: m.score,
            total_questions: m.total_questions,
            correct_count: m.correct_count,
            answers: m.answers,
            started_at: m.started_at,
            completed_at: m.completed_at,
            ip_address: m.ip_address,
            created_at: m.created_at,
        }
    }
}
