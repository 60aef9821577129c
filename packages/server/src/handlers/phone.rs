use axum::Json;
use axum::extract::{Path, State};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{debug, instrument};

use crate::entity::phone_number;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::phone::*;
use crate::models::shared::{
    ApiResponse, MessageBody, Paginated, Pagination, normalize_optional, resolve_page,
};
use crate::services::phone_lookup::{CachedNumber, CarrierInfo};
use crate::state::AppState;
use crate::utils::phone::{is_valid_mobile, mask, normalize_mobile};

/// Source recorded for rows corrected by an operator. Never refreshed from a provider.
const MANUAL_SOURCE: &str = "manual";

#[utoipa::path(
    get,
    path = "/lookup",
    tag = "Phone Numbers",
    operation_id = "lookupPhone",
    summary = "Look up the carrier and region of a mobile number",
    description = "Checks the in-memory cache, then a stored row younger than the cache TTL, \
        then the configured providers. Provider results are stored.",
    params(LookupQuery),
    responses(
        (status = 200, description = "Carrier data", body = ApiResponse<LookupResponse>),
        (status = 400, description = "Not a valid mobile number (VALIDATION_ERROR)", body = ErrorBody),
        (status = 502, description = "No provider could resolve the number (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn lookup(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<LookupQuery>,
) -> Result<Json<ApiResponse<LookupResponse>>, AppError> {
    let result = lookup_one(&state, &query.phone).await?;
    Ok(Json(ApiResponse::ok(result)))
}

#[utoipa::path(
    post,
    path = "/lookup/batch",
    tag = "Phone Numbers",
    operation_id = "lookupPhoneBatch",
    summary = "Look up up to 100 numbers",
    description = "Each number is resolved like `/lookup`; failures are reported per number.",
    request_body = BatchLookupRequest,
    responses(
        (status = 200, description = "Per-number results in request order", body = ApiResponse<BatchLookupResponse>),
        (status = 400, description = "Empty or oversized batch (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(count = payload.phones.len()))]
pub async fn lookup_batch(
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchLookupRequest>,
) -> Result<Json<ApiResponse<BatchLookupResponse>>, AppError> {
    validate_batch(&payload)?;

    let mut results = Vec::with_capacity(payload.phones.len());
    for phone in payload.phones {
        let item = match lookup_one(&state, &phone).await {
            Ok(result) => BatchLookupItem {
                phone,
                result: Some(result),
                error: None,
            },
            Err(e) => BatchLookupItem {
                phone,
                result: None,
                error: Some(e.into_message()),
            },
        };
        results.push(item);
    }

    let succeeded = results.iter().filter(|r| r.result.is_some()).count();
    Ok(Json(ApiResponse::ok(BatchLookupResponse {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
        results,
    })))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Phone Numbers",
    operation_id = "listPhoneNumbers",
    summary = "List stored numbers",
    params(PhoneListQuery),
    responses(
        (status = 200, description = "Page of numbers, most recently updated first", body = ApiResponse<Paginated<PhoneRecordResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_numbers(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PhoneListQuery>,
) -> Result<Json<ApiResponse<Paginated<PhoneRecordResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = phone_number::Entity::find();
    if let Some(carrier) = normalize_optional(query.carrier) {
        select = select.filter(phone_number::Column::Carrier.eq(carrier));
    }
    if let Some(province) = normalize_optional(query.province) {
        select = select.filter(phone_number::Column::Province.eq(province));
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_desc(phone_number::Column::UpdatedAt)
        .order_by_desc(phone_number::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(Paginated {
        items: items.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, limit, total),
    })))
}

#[utoipa::path(
    put,
    path = "/{phone}",
    tag = "Phone Numbers",
    operation_id = "updatePhoneNumber",
    summary = "Correct a stored number",
    description = "Changing carrier, province or city marks the row as `manual` so lookups \
        stop refreshing it from providers. Drops the cached entry.",
    params(("phone" = String, Path, description = "Mobile number")),
    request_body = UpdatePhoneRequest,
    responses(
        (status = 200, description = "Number updated", body = ApiResponse<PhoneRecordResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Number not stored (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(phone = %mask(&phone)))]
pub async fn update_number(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(phone): Path<String>,
    AppJson(payload): AppJson<UpdatePhoneRequest>,
) -> Result<Json<ApiResponse<PhoneRecordResponse>>, AppError> {
    validate_update_phone(&payload)?;

    let phone = normalize_mobile(&phone);
    let existing = find_number(&state.db, &phone).await?;
    if payload == UpdatePhoneRequest::default() {
        return Ok(Json(ApiResponse::ok(existing.into())));
    }

    let manual = payload.touches_carrier_data();
    let mut active: phone_number::ActiveModel = existing.into();
    if let Some(carrier) = payload.carrier {
        active.carrier = Set(carrier.trim().to_string());
    }
    if let Some(province) = payload.province {
        active.province = Set(normalize_optional(province));
    }
    if let Some(city) = payload.city {
        active.city = Set(normalize_optional(city));
    }
    if let Some(note) = payload.note {
        active.note = Set(normalize_optional(note));
    }
    if manual {
        active.source = Set(MANUAL_SOURCE.to_string());
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    state.phone_lookup.invalidate(&phone).await;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    delete,
    path = "/{phone}",
    tag = "Phone Numbers",
    operation_id = "deletePhoneNumber",
    summary = "Delete a stored number",
    params(("phone" = String, Path, description = "Mobile number")),
    responses(
        (status = 200, description = "Number deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Number not stored (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(phone = %mask(&phone)))]
pub async fn delete_number(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    let phone = normalize_mobile(&phone);
    let result = phone_number::Entity::delete_many()
        .filter(phone_number::Column::Phone.eq(phone.as_str()))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Phone number not found".into()));
    }
    state.phone_lookup.invalidate(&phone).await;
    Ok(Json(MessageBody::new("Phone number deleted")))
}

/// Cache, then stored row, then providers.
async fn lookup_one(state: &AppState, raw: &str) -> Result<LookupResponse, AppError> {
    let phone = normalize_mobile(raw);
    if !is_valid_mobile(&phone) {
        return Err(AppError::Validation(format!("Invalid phone number: {raw}")));
    }
    let service = &state.phone_lookup;

    if let Some(hit) = service.cached(&phone).await {
        debug!(phone = %mask(&phone), "Phone lookup served from memory");
        return Ok(response_from_cache(phone, hit));
    }

    let stored = phone_number::Entity::find()
        .filter(phone_number::Column::Phone.eq(phone.as_str()))
        .one(&state.db)
        .await?;
    if let Some(row) = stored
        && (row.source == MANUAL_SOURCE || service.is_fresh(row.updated_at))
    {
        service
            .remember(&phone, cached_from_row(&row), row.updated_at)
            .await;
        return Ok(LookupResponse::from_model(row, true));
    }

    let info = service.resolve(&phone).await?;
    let row = store(&state.db, &phone, &info).await?;
    service
        .remember(&phone, cached_from_row(&row), row.updated_at)
        .await;
    Ok(LookupResponse::from_model(row, false))
}

/// Insert or refresh the provider data of a number, keeping its note.
async fn store<C: ConnectionTrait>(
    db: &C,
    phone: &str,
    info: &CarrierInfo,
) -> Result<phone_number::Model, AppError> {
    let now = chrono::Utc::now();
    let row = phone_number::ActiveModel {
        phone: Set(phone.to_string()),
        carrier: Set(info.carrier.clone()),
        province: Set(info.province.clone()),
        city: Set(info.city.clone()),
        note: Set(None),
        source: Set(info.source.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    phone_number::Entity::insert(row)
        .on_conflict(
            OnConflict::column(phone_number::Column::Phone)
                .update_columns([
                    phone_number::Column::Carrier,
                    phone_number::Column::Province,
                    phone_number::Column::City,
                    phone_number::Column::Source,
                    phone_number::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_number(db, phone).await
}

async fn find_number<C: ConnectionTrait>(
    db: &C,
    phone: &str,
) -> Result<phone_number::Model, AppError> {
    phone_number::Entity::find()
        .filter(phone_number::Column::Phone.eq(phone))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Phone number not found".into()))
}

fn cached_from_row(row: &phone_number::Model) -> CachedNumber {
    CachedNumber {
        info: CarrierInfo {
            carrier: row.carrier.clone(),
            province: row.province.clone(),
            city: row.city.clone(),
            source: row.source.clone(),
        },
        note: row.note.clone(),
    }
}

fn response_from_cache(phone: String, hit: CachedNumber) -> LookupResponse {
    LookupResponse {
        phone,
        carrier: hit.info.carrier,
        province: hit.info.province,
        city: hit.info.city,
        note: hit.note,
        source: hit.info.source,
        cached: true,
    }
}
