use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;
/// Highest page number honoured; larger requests are served as this page.
pub const MAX_PAGE: u64 = 1_000_000;

/// Success envelope shared by every endpoint.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = true)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

/// Body for endpoints that only report an outcome.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageBody {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Deleted")]
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Serialize, utoipa::ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub limit: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    #[schema(example = 3)]
    pub total_pages: u64,
    /// Whether rows exist past this page.
    #[schema(example = true)]
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

/// A page of rows together with its metadata.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Resolve optional `page`/`limit` query values into `(page, limit, offset)`.
pub fn resolve_page(page: Option<u64>, limit: Option<u64>) -> (u64, u64, u64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Serde helper for nullable fields in update requests.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a required, trimmed name of at most `max` characters.
pub fn validate_name(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

/// Validate a percentage-like value.
pub fn validate_percent(field: &str, value: i32) -> Result<(), AppError> {
    if !(0..=100).contains(&value) {
        return Err(AppError::Validation(format!("{field} must be 0-100")));
    }
    Ok(())
}

/// Trim an optional string, turning blank input into `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
