use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::system_config;
use crate::error::AppError;

/// Pass mark for training records, read by the stats endpoint.
pub const TRAINING_PASS_SCORE: &str = "training_pass_score";
pub const DEFAULT_PASS_SCORE: i32 = 60;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpsertConfigRequest {
    #[schema(example = "70")]
    pub value: String,
    pub description: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ConfigResponse {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<system_config::Model> for ConfigResponse {
    fn from(m: system_config::Model) -> Self {
        Self {
            key: m.config_key,
            value: m.config_value,
            description: m.description,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_key(key: &str) -> Result<(), AppError> {
    if key.is_empty() || key.len() > 100 {
        return Err(AppError::Validation("key must be 1-100 characters".into()));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(AppError::Validation(
            "key must contain only letters, digits, '_', '.' and '-'".into(),
        ));
    }
    Ok(())
}

/// Validate the value of a key with known semantics.
pub fn validate_value(key: &str, value: &str) -> Result<(), AppError> {
    if value.len() > 10_000 {
        return Err(AppError::Validation("value too long".into()));
    }
    if key == TRAINING_PASS_SCORE {
        match value.trim().parse::<i32>() {
            Ok(score) if (0..=100).contains(&score) => {}
            _ => {
                return Err(AppError::Validation(
                    "training_pass_score must be an integer 0-100".into(),
                ));
            }
        }
    }
    Ok(())
}
