use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::sms_log::SmsStatus;
use crate::entity::{sms_log, sms_template};
use crate::error::AppError;

use super::shared::validate_name;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTemplateRequest {
    /// Unique machine code, e.g. `VERIFY_CODE`.
    #[schema(example = "ORDER_SHIPPED")]
    pub code: String,
    pub name: String,
    #[schema(example = "您的订单${order}已发货")]
    pub content: String,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateTemplateRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TemplateResponse {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub content: String,
    /// Placeholder names found in `content`.
    pub params: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<sms_template::Model> for TemplateResponse {
    fn from(m: sms_template::Model) -> Self {
        Self {
            params: crate::utils::template::placeholders(&m.content),
            id: m.id,
            code: m.code,
            name: m.name,
            content: m.content,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Either inline `content` or a stored `template_code`, plus values.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct PreviewRequest {
    pub content: Option<String>,
    pub template_code: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub content: String,
    /// Length in characters, signature excluded.
    pub length: usize,
    pub segments: usize,
    pub missing_params: Vec<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SendSmsRequest {
    #[schema(example = "13812345678")]
    pub phone: String,
    pub content: Option<String>,
    pub template_code: Option<String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SendSmsResponse {
    pub log_id: i32,
    pub status: SmsStatus,
    pub message_id: Option<String>,
    pub segments: usize,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SmsLogQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Exact phone number filter.
    pub phone: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SmsLogResponse {
    pub id: i32,
    pub phone: String,
    pub template_code: Option<String>,
    pub content: String,
    pub status: SmsStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<sms_log::Model> for SmsLogResponse {
    fn from(m: sms_log::Model) -> Self {
        Self {
            id: m.id,
            phone: m.phone,
            template_code: m.template_code,
            content: m.content,
            status: m.status,
            error: m.error,
            created_at: m.created_at,
        }
    }
}

fn validate_code(code: &str) -> Result<(), AppError> {
    let code = code.trim();
    if code.is_empty() || code.len() > 64 {
        return Err(AppError::Validation("code must be 1-64 characters".into()));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "code must contain only letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), AppError> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("content is required".into()));
    }
    if content.chars().count() > 1000 {
        return Err(AppError::Validation(
            "content must be at most 1000 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_template(req: &CreateTemplateRequest) -> Result<(), AppError> {
    validate_code(&req.code)?;
    validate_name("name", &req.name, 100)?;
    validate_content(&req.content)
}

pub fn validate_update_template(req: &UpdateTemplateRequest) -> Result<(), AppError> {
    if let Some(ref code) = req.code {
        validate_code(code)?;
    }
    if let Some(ref name) = req.name {
        validate_name("name", name, 100)?;
    }
    if let Some(ref content) = req.content {
        validate_content(content)?;
    }
    Ok(())
}

/// Exactly one of `content` / `template_code` must be given.
pub fn validate_source(
    content: Option<&str>,
    template_code: Option<&str>,
) -> Result<(), AppError> {
    match (content, template_code) {
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Provide either content or template_code, not both".into(),
        )),
        (None, None) => Err(AppError::Validation(
            "content or template_code is required".into(),
        )),
        (Some(c), None) => validate_content(c),
        (None, Some(_)) => Ok(()),
    }
}
