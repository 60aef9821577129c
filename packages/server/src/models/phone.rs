use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::phone_number;
use crate::error::AppError;

use super::shared::double_option;

pub const MAX_BATCH_LOOKUP: usize = 100;

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LookupQuery {
    #[param(example = "13812345678")]
    pub phone: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LookupResponse {
    pub phone: String,
    pub carrier: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub note: Option<String>,
    pub source: String,
    /// `true` when served without calling a provider.
    pub cached: bool,
}

impl LookupResponse {
    pub fn from_model(m: phone_number::Model, cached: bool) -> Self {
        Self {
            phone: m.phone,
            carrier: m.carrier,
            province: m.province,
            city: m.city,
            note: m.note,
            source: m.source,
            cached,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct BatchLookupRequest {
    pub phones: Vec<String>,
}

pub fn validate_batch(req: &BatchLookupRequest) -> Result<(), AppError> {
    if req.phones.is_empty() {
        return Err(AppError::Validation("phones must not be empty".into()));
    }
    if req.phones.len() > MAX_BATCH_LOOKUP {
        return Err(AppError::Validation(format!(
            "Too many phones: max {MAX_BATCH_LOOKUP}"
        )));
    }
    Ok(())
}

/// Result for one number of a batch; exactly one of `result` / `error` is set.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchLookupItem {
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<LookupResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BatchLookupResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchLookupItem>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PhoneListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub carrier: Option<String>,
    pub province: Option<String>,
}

/// Manual correction of a stored number.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdatePhoneRequest {
    pub carrier: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub province: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub city: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub note: Option<Option<String>>,
}

impl UpdatePhoneRequest {
    /// Whether the request corrects carrier data rather than only the note.
    pub fn touches_carrier_data(&self) -> bool {
        self.carrier.is_some() || self.province.is_some() || self.city.is_some()
    }
}

pub fn validate_update_phone(req: &UpdatePhoneRequest) -> Result<(), AppError> {
    if let Some(ref carrier) = req.carrier
        && (carrier.trim().is_empty() || carrier.chars().count() > 50)
    {
        return Err(AppError::Validation("carrier must be 1-50 characters".into()));
    }
    if let Some(Some(ref note)) = req.note
        && note.chars().count() > 500
    {
        return Err(AppError::Validation(
            "note must be at most 500 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PhoneRecordResponse {
    pub id: i32,
    pub phone: String,
    pub carrier: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub note: Option<String>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<phone_number::Model> for PhoneRecordResponse {
    fn from(m: phone_number::Model) -> Self {
        Self {
            id: m.id,
            phone: m.phone,
            carrier: m.carrier,
            province: m.province,
            city: m.city,
            note: m.note,
            source: m.source,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
