use axum::Json;
use axum::extract::{Path, State};
use sea_orm::*;
use tracing::{instrument, warn};

use crate::entity::system_config;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{ApiResponse, MessageBody};
use crate::models::system_config::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "System Config",
    operation_id = "listSystemConfig",
    summary = "List all configuration entries",
    responses(
        (status = 200, description = "Entries ordered by key", body = ApiResponse<Vec<ConfigResponse>>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin))]
pub async fn list_configs(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ConfigResponse>>>, AppError> {
    let rows = system_config::Entity::find()
        .order_by_asc(system_config::Column::ConfigKey)
        .all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(rows.into_iter().map(Into::into).collect())))
}

#[utoipa::path(
    get,
    path = "/{key}",
    tag = "System Config",
    operation_id = "getSystemConfig",
    summary = "Get one configuration entry",
    params(("key" = String, Path, description = "Config key")),
    responses(
        (status = 200, description = "Entry", body = ApiResponse<ConfigResponse>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Unknown key (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(key = %key))]
pub async fn get_config(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<ConfigResponse>>, AppError> {
    let row = system_config::Entity::find_by_id(key.clone())
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Config '{key}' not found")))?;
    Ok(Json(ApiResponse::ok(row.into())))
}

#[utoipa::path(
    put,
    path = "/{key}",
    tag = "System Config",
    operation_id = "upsertSystemConfig",
    summary = "Create or replace a configuration entry",
    description = "An omitted `description` keeps the stored one. \
        `training_pass_score` must be an integer 0-100.",
    params(("key" = String, Path, description = "Config key")),
    request_body = UpsertConfigRequest,
    responses(
        (status = 200, description = "Entry stored", body = ApiResponse<ConfigResponse>),
        (status = 400, description = "Invalid key or value (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(key = %key))]
pub async fn upsert_config(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    AppJson(payload): AppJson<UpsertConfigRequest>,
) -> Result<Json<ApiResponse<ConfigResponse>>, AppError> {
    validate_key(&key)?;
    validate_value(&key, &payload.value)?;

    let txn = state.db.begin().await?;
    let now = chrono::Utc::now();
    let model = match system_config::Entity::find_by_id(key.clone())
        .one(&txn)
        .await?
    {
        Some(existing) => {
            let mut active: system_config::ActiveModel = existing.into();
            active.config_value = Set(payload.value);
            if let Some(description) = payload.description {
                active.description = Set(Some(description));
            }
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            system_config::ActiveModel {
                config_key: Set(key),
                config_value: Set(payload.value),
                description: Set(payload.description),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?
        }
    };
    txn.commit().await?;

    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    delete,
    path = "/{key}",
    tag = "System Config",
    operation_id = "deleteSystemConfig",
    summary = "Delete a configuration entry",
    params(("key" = String, Path, description = "Config key")),
    responses(
        (status = 200, description = "Entry deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Unknown key (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(key = %key))]
pub async fn delete_config(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    let result = system_config::Entity::delete_by_id(key.clone())
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Config '{key}' not found")));
    }
    Ok(Json(MessageBody::new("Config deleted")))
}

/// Current training pass mark, falling back to the default when the entry
/// is missing or unreadable.
pub(crate) async fn pass_score<C: ConnectionTrait>(db: &C) -> Result<i32, AppError> {
    let value = system_config::Entity::find_by_id(TRAINING_PASS_SCORE.to_string())
        .one(db)
        .await?
        .map(|m| m.config_value);

    Ok(match value.as_deref().map(str::trim).map(str::parse::<i32>) {
        Some(Ok(score)) if (0..=100).contains(&score) => score,
        Some(_) => {
            warn!(value = ?value, "Ignoring invalid training_pass_score");
            DEFAULT_PASS_SCORE
        }
        None => DEFAULT_PASS_SCORE,
    })
}
