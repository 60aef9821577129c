use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{instrument, warn};

use crate::entity::sms_log::{self, SmsStatus};
use crate::entity::sms_template;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AdminUser, VerifiedAdmin};
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::shared::{ApiResponse, MessageBody, Paginated, Pagination, resolve_page};
use crate::models::sms::*;
use crate::services::sms::Delivery;
use crate::state::AppState;
use crate::utils::phone::{is_valid_mobile, mask, normalize_mobile};
use crate::utils::template::{render, segment_count};

#[utoipa::path(
    get,
    path = "/templates",
    tag = "SMS",
    operation_id = "listSmsTemplates",
    summary = "List SMS templates",
    responses(
        (status = 200, description = "All templates ordered by code", body = ApiResponse<Vec<TemplateResponse>>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin))]
pub async fn list_templates(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TemplateResponse>>>, AppError> {
    let templates = sms_template::Entity::find()
        .order_by_asc(sms_template::Column::Code)
        .all(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(
        templates.into_iter().map(Into::into).collect(),
    )))
}

#[utoipa::path(
    post,
    path = "/templates",
    tag = "SMS",
    operation_id = "createSmsTemplate",
    summary = "Create an SMS template",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created", body = ApiResponse<TemplateResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 409, description = "Code already used (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(code = %payload.code))]
pub async fn create_template(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_template(&payload)?;

    let now = chrono::Utc::now();
    let model = sms_template::ActiveModel {
        code: Set(payload.code.trim().to_string()),
        name: Set(payload.name.trim().to_string()),
        content: Set(payload.content),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(code_conflict)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(TemplateResponse::from(model))),
    ))
}

#[utoipa::path(
    get,
    path = "/templates/{id}",
    tag = "SMS",
    operation_id = "getSmsTemplate",
    summary = "Get an SMS template",
    params(("id" = i32, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template", body = ApiResponse<TemplateResponse>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn get_template(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TemplateResponse>>, AppError> {
    let model = find_template(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    put,
    path = "/templates/{id}",
    tag = "SMS",
    operation_id = "updateSmsTemplate",
    summary = "Update an SMS template",
    description = "Only provided fields are modified.",
    params(("id" = i32, Path, description = "Template ID")),
    request_body = UpdateTemplateRequest,
    responses(
        (status = 200, description = "Template updated", body = ApiResponse<TemplateResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Code already used (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_template(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTemplateRequest>,
) -> Result<Json<ApiResponse<TemplateResponse>>, AppError> {
    validate_update_template(&payload)?;

    let existing = find_template(&state.db, id).await?;
    if payload == UpdateTemplateRequest::default() {
        return Ok(Json(ApiResponse::ok(existing.into())));
    }

    let mut active: sms_template::ActiveModel = existing.into();
    if let Some(code) = payload.code {
        active.code = Set(code.trim().to_string());
    }
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await.map_err(code_conflict)?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    delete,
    path = "/templates/{id}",
    tag = "SMS",
    operation_id = "deleteSmsTemplate",
    summary = "Delete an SMS template",
    description = "Existing send logs keep the template code as plain text.",
    params(("id" = i32, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_template(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let result = sms_template::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Template not found".into()));
    }
    Ok(Json(MessageBody::new("Template deleted")))
}

#[utoipa::path(
    post,
    path = "/preview",
    tag = "SMS",
    operation_id = "previewSms",
    summary = "Render a message without sending it",
    description = "Substitutes `${name}` and `{name}` placeholders and reports length and segment count. \
        A message of up to 70 characters is one segment; longer ones are split into 67-character parts.",
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Rendered message", body = ApiResponse<PreviewResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload))]
pub async fn preview(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PreviewRequest>,
) -> Result<Json<ApiResponse<PreviewResponse>>, AppError> {
    validate_source(payload.content.as_deref(), payload.template_code.as_deref())?;

    let (body, _) = resolve_body(
        &state.db,
        payload.content,
        payload.template_code.as_deref(),
    )
    .await?;
    let rendered = render(&body, &payload.params);
    let length = rendered.content.chars().count();

    Ok(Json(ApiResponse::ok(PreviewResponse {
        content: rendered.content,
        length,
        segments: segment_count(length),
        missing_params: rendered.missing,
    })))
}

#[utoipa::path(
    post,
    path = "/send",
    tag = "SMS",
    operation_id = "sendSms",
    summary = "Send an SMS",
    description = "Renders the message and sends it through the configured gateway, or logs it when none is configured. \
        Requires a verification token; the login cookie is not needed. Every attempt is written to the send log.",
    request_body = SendSmsRequest,
    params(("X-Verify-Token" = String, Header, description = "Token from /api/auth/verify-code")),
    responses(
        (status = 200, description = "Message accepted", body = ApiResponse<SendSmsResponse>),
        (status = 400, description = "Invalid phone or unresolved placeholders (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Token missing or expired (TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Template not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Gateway failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _verified, payload), fields(phone = %mask(&payload.phone)))]
pub async fn send(
    _verified: VerifiedAdmin,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendSmsRequest>,
) -> Result<Json<ApiResponse<SendSmsResponse>>, AppError> {
    let phone = normalize_mobile(&payload.phone);
    if !is_valid_mobile(&phone) {
        return Err(AppError::Validation(format!(
            "Invalid phone number: {}",
            payload.phone
        )));
    }
    validate_source(payload.content.as_deref(), payload.template_code.as_deref())?;

    let (body, template_code) = resolve_body(
        &state.db,
        payload.content,
        payload.template_code.as_deref(),
    )
    .await?;
    let rendered = render(&body, &payload.params);
    if !rendered.missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing template params: {}",
            rendered.missing.join(", ")
        )));
    }
    let segments = segment_count(rendered.content.chars().count());

    let outcome = state.sms.send(&phone, &rendered.content).await;
    let (status, message_id, error) = match &outcome {
        Ok(Delivery::Sent { message_id }) => (SmsStatus::Sent, message_id.clone(), None),
        Ok(Delivery::DryRun) => (SmsStatus::DryRun, None, None),
        Err(e) => {
            warn!(error = %e, "SMS send failed");
            (SmsStatus::Failed, None, Some(e.to_string()))
        }
    };

    let log = sms_log::ActiveModel {
        phone: Set(phone),
        template_code: Set(template_code),
        content: Set(rendered.content),
        status: Set(status),
        error: Set(error),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    outcome?;

    Ok(Json(ApiResponse::ok(SendSmsResponse {
        log_id: log.id,
        status,
        message_id,
        segments,
    })))
}

#[utoipa::path(
    get,
    path = "/logs",
    tag = "SMS",
    operation_id = "listSmsLogs",
    summary = "List send logs",
    description = "Newest first, optionally filtered by phone.",
    params(SmsLogQuery),
    responses(
        (status = 200, description = "Page of logs", body = ApiResponse<Paginated<SmsLogResponse>>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, query))]
pub async fn list_logs(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SmsLogQuery>,
) -> Result<Json<ApiResponse<Paginated<SmsLogResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = sms_log::Entity::find();
    if let Some(ref phone) = query.phone {
        let phone = normalize_mobile(phone);
        if !phone.is_empty() {
            select = select.filter(sms_log::Column::Phone.eq(phone));
        }
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_desc(sms_log::Column::CreatedAt)
        .order_by_desc(sms_log::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(Paginated {
        items: items.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    })))
}

/// Message body and template code for a send or preview.
async fn resolve_body<C: ConnectionTrait>(
    db: &C,
    content: Option<String>,
    template_code: Option<&str>,
) -> Result<(String, Option<String>), AppError> {
    match (content, template_code) {
        (Some(content), _) => Ok((content, None)),
        (None, Some(code)) => {
            let template = sms_template::Entity::find()
                .filter(sms_template::Column::Code.eq(code.trim()))
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Template {code} not found")))?;
            Ok((template.content, Some(template.code)))
        }
        (None, None) => Err(AppError::Validation(
            "content or template_code is required".into(),
        )),
    }
}

async fn find_template<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<sms_template::Model, AppError> {
    sms_template::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".into()))
}

fn code_conflict(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Template code already exists".into())
        }
        _ => AppError::from(e),
    }
}
