use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::import_record::ImportStatus;
use crate::entity::{company, failed_company, import_record};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::import::*;
use crate::models::shared::{
    ApiResponse, MessageBody, Paginated, Pagination, escape_like, normalize_optional,
    resolve_page,
};
use crate::state::AppState;

/// Rows per INSERT / IN-list, kept under SQLite's bound-parameter limit.
const CHUNK: usize = 500;

#[utoipa::path(
    post,
    path = "/companies",
    tag = "Import",
    operation_id = "importCompanies",
    summary = "Import a batch of companies",
    description = "Validates every row, skips rows whose name or credit code already exists \
        (in the database or earlier in the batch), inserts the rest and records the batch. \
        Failed rows are stored with their raw data. At most 5000 rows per request.",
    request_body = ImportCompaniesRequest,
    responses(
        (status = 201, description = "Batch processed", body = ApiResponse<ImportSummary>),
        (status = 400, description = "Empty or oversized batch (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 409, description = "Concurrent import inserted the same company (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(rows = payload.companies.len()))]
pub async fn import_companies(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImportCompaniesRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_import_request(&payload)?;

    let existing = existing_keys(&state.db, &payload.companies).await?;
    let partition = partition_rows(&payload.companies, &existing);

    let total_rows = payload.companies.len() as i32;
    let success_count = partition.valid.len() as i32;
    let failed_count = partition.failures.len() as i32;
    let status = ImportStatus::from_counts(success_count, failed_count);
    let batch_id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now();

    let txn = state.db.begin().await?;
    let record = import_record::ActiveModel {
        batch_id: Set(batch_id.clone()),
        file_name: Set(normalize_optional(payload.file_name)),
        total_rows: Set(total_rows),
        success_count: Set(success_count),
        failed_count: Set(failed_count),
        status: Set(status),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for chunk in partition.valid.chunks(CHUNK) {
        let rows = chunk.iter().map(|(_, c)| company::ActiveModel {
            name: Set(c.name.clone()),
            credit_code: Set(c.credit_code.clone()),
            contact_person: Set(c.contact_person.clone()),
            contact_phone: Set(c.contact_phone.clone()),
            address: Set(c.address.clone()),
            category: Set(c.category.clone()),
            import_id: Set(Some(record.id)),
            created_at: Set(now),
            ..Default::default()
        });
        company::Entity::insert_many(rows)
            .exec(&txn)
            .await
            .map_err(company_conflict)?;
    }

    for chunk in partition.failures.chunks(CHUNK) {
        let rows = chunk.iter().map(|f| {
            let raw = payload
                .companies
                .get((f.row_number - 1) as usize)
                .and_then(|r| serde_json::to_value(r).ok())
                .unwrap_or(serde_json::Value::Null);
            failed_company::ActiveModel {
                import_id: Set(record.id),
                row_number: Set(f.row_number),
                company_name: Set(f.company_name.clone()),
                reason: Set(f.reason.clone()),
                raw_data: Set(raw),
                created_at: Set(now),
                ..Default::default()
            }
        });
        failed_company::Entity::insert_many(rows).exec(&txn).await?;
    }

    txn.commit().await?;

    info!(
        import_id = record.id,
        success_count,
        failed_count,
        "Company import finished"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ImportSummary {
            import_id: record.id,
            batch_id,
            total_rows,
            success_count,
            failed_count,
            status,
            failures: partition.failures,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/history",
    tag = "Import",
    operation_id = "listImportHistory",
    summary = "List import batches",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Page of batches, newest first", body = ApiResponse<Paginated<ImportRecordResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, query))]
pub async fn list_history(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<Json<ApiResponse<Paginated<ImportRecordResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = import_record::Entity::find();
    if let Some(status) = query.status {
        select = select.filter(import_record::Column::Status.eq(status));
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_desc(import_record::Column::CreatedAt)
        .order_by_desc(import_record::Column::Id)
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
    get,
    path = "/history/{id}",
    tag = "Import",
    operation_id = "getImportHistory",
    summary = "Get an import batch with its failed rows",
    params(("id" = i32, Path, description = "Import record ID")),
    responses(
        (status = 200, description = "Batch detail", body = ApiResponse<ImportDetailResponse>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Import record not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn get_history(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ImportDetailResponse>>, AppError> {
    let record = find_record(&state.db, id).await?;
    let failures = failed_company::Entity::find()
        .filter(failed_company::Column::ImportId.eq(id))
        .order_by_asc(failed_company::Column::RowNumber)
        .all(&state.db)
        .await?;

    Ok(Json(ApiResponse::ok(ImportDetailResponse {
        record: record.into(),
        failures: failures.into_iter().map(Into::into).collect(),
    })))
}

#[utoipa::path(
    delete,
    path = "/history/{id}",
    tag = "Import",
    operation_id = "deleteImportHistory",
    summary = "Delete an import batch record",
    description = "Deletes the failed rows and the batch record in one transaction. \
        Companies imported by the batch are kept; their `import_id` is cleared.",
    params(("id" = i32, Path, description = "Import record ID")),
    responses(
        (status = 200, description = "Batch record deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Import record not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_history(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    find_record(&txn, id).await?;

    company::Entity::update_many()
        .col_expr(company::Column::ImportId, Expr::value(Option::<i32>::None))
        .filter(company::Column::ImportId.eq(id))
        .exec(&txn)
        .await?;
    failed_company::Entity::delete_many()
        .filter(failed_company::Column::ImportId.eq(id))
        .exec(&txn)
        .await?;
    import_record::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(Json(MessageBody::new("Import record deleted")))
}

#[utoipa::path(
    get,
    path = "/companies",
    tag = "Import",
    operation_id = "listCompanies",
    summary = "List imported companies",
    params(CompanyListQuery),
    responses(
        (status = 200, description = "Page of companies, newest first", body = ApiResponse<Paginated<CompanyResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, query))]
pub async fn list_companies(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CompanyListQuery>,
) -> Result<Json<ApiResponse<Paginated<CompanyResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = company::Entity::find();
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            let pattern = format!("%{}%", term.to_lowercase());
            let like = |col: company::Column| {
                Expr::expr(Func::lower(Expr::col(col)))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            select = select.filter(
                Condition::any()
                    .add(like(company::Column::Name))
                    .add(like(company::Column::CreditCode))
                    .add(like(company::Column::ContactPerson)),
            );
        }
    }
    if let Some(category) = normalize_optional(query.category) {
        select = select.filter(company::Column::Category.eq(category));
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_desc(company::Column::CreatedAt)
        .order_by_desc(company::Column::Id)
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
    delete,
    path = "/companies/{id}",
    tag = "Import",
    operation_id = "deleteCompany",
    summary = "Delete a company",
    params(("id" = i32, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Company not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_company(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let result = company::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Company not found".into()));
    }
    Ok(Json(MessageBody::new("Company deleted")))
}

/// Look up which of the batch's names and credit codes are already stored.
async fn existing_keys<C: ConnectionTrait>(
    db: &C,
    rows: &[CompanyRow],
) -> Result<ExistingKeys, AppError> {
    let names: Vec<String> = rows
        .iter()
        .filter_map(|r| normalize_optional(r.name.clone()))
        .collect();
    let codes: Vec<String> = rows
        .iter()
        .filter_map(|r| normalize_optional(r.credit_code.clone()))
        .map(|c| c.to_uppercase())
        .collect();

    let mut keys = ExistingKeys::default();
    for chunk in names.chunks(CHUNK) {
        let found: Vec<String> = company::Entity::find()
            .select_only()
            .column(company::Column::Name)
            .filter(company::Column::Name.is_in(chunk.iter().cloned()))
            .into_tuple()
            .all(db)
            .await?;
        keys.names.extend(found);
    }
    for chunk in codes.chunks(CHUNK) {
        let found: Vec<Option<String>> = company::Entity::find()
            .select_only()
            .column(company::Column::CreditCode)
            .filter(company::Column::CreditCode.is_in(chunk.iter().cloned()))
            .into_tuple()
            .all(db)
            .await?;
        keys.credit_codes.extend(found.into_iter().flatten());
    }
    Ok(keys)
}

async fn find_record<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<import_record::Model, AppError> {
    import_record::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Import record not found".into()))
}

fn company_conflict(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
            "A company in this batch was inserted concurrently, retry the import".into(),
        ),
        _ => AppError::from(e),
    }
}
