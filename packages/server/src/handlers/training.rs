use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{debug, info, instrument};

use crate::entity::{exam_category, question, question_set, training_record};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::client_ip::ClientIp;
use crate::extractors::json::{AppJson, AppQuery};
use crate::handlers::system_config::pass_score;
use crate::models::shared::{
    ApiResponse, MessageBody, Paginated, Pagination, escape_like, normalize_optional,
    resolve_page,
};
use crate::models::training::*;
use crate::state::AppState;

// ---- categories ----

#[utoipa::path(
    get,
    path = "/categories",
    tag = "Training",
    operation_id = "listCategories",
    summary = "List exam categories",
    description = "Ordered by `sort_order`, then id. Each entry carries the number of question sets in it.",
    responses((status = 200, description = "Categories", body = ApiResponse<Vec<CategoryResponse>>)),
)]
#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, AppError> {
    let categories = exam_category::Entity::find()
        .order_by_asc(exam_category::Column::SortOrder)
        .order_by_asc(exam_category::Column::Id)
        .all(&state.db)
        .await?;

    let counts: HashMap<i32, u64> = question_set::Entity::find()
        .select_only()
        .column(question_set::Column::CategoryId)
        .column_as(question_set::Column::Id.count(), "set_count")
        .filter(question_set::Column::CategoryId.is_not_null())
        .group_by(question_set::Column::CategoryId)
        .into_tuple::<(Option<i32>, i64)>()
        .all(&state.db)
        .await?
        .into_iter()
        .filter_map(|(id, count)| id.map(|id| (id, Ord::max(count, 0) as u64)))
        .collect();

    let data = categories
        .into_iter()
        .map(|c| {
            let count = counts.get(&c.id).copied().unwrap_or(0);
            CategoryResponse::from_model(c, count)
        })
        .collect();
    Ok(Json(ApiResponse::ok(data)))
}

#[utoipa::path(
    post,
    path = "/categories",
    tag = "Training",
    operation_id = "createCategory",
    summary = "Create an exam category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 409, description = "Name already used (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(name = %payload.name))]
pub async fn create_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_category(&payload)?;

    let sort_order = match payload.sort_order {
        Some(s) => s,
        None => next_category_order(&state.db).await?,
    };
    let model = exam_category::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        icon: Set(normalize_optional(payload.icon)),
        color: Set(normalize_optional(payload.color)),
        sort_order: Set(sort_order),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(category_conflict)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CategoryResponse::from_model(model, 0))),
    ))
}

#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "Training",
    operation_id = "updateCategory",
    summary = "Update an exam category",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name already used (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<Json<ApiResponse<CategoryResponse>>, AppError> {
    validate_update_category(&payload)?;

    let existing = find_category(&state.db, id).await?;
    let model = if payload == UpdateCategoryRequest::default() {
        existing
    } else {
        let mut active: exam_category::ActiveModel = existing.into();
        if let Some(name) = payload.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(icon) = payload.icon {
            active.icon = Set(normalize_optional(icon));
        }
        if let Some(color) = payload.color {
            active.color = Set(normalize_optional(color));
        }
        if let Some(sort_order) = payload.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.update(&state.db).await.map_err(category_conflict)?
    };

    let set_count = question_set::Entity::find()
        .filter(question_set::Column::CategoryId.eq(id))
        .count(&state.db)
        .await?;
    Ok(Json(ApiResponse::ok(CategoryResponse::from_model(
        model, set_count,
    ))))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "Training",
    operation_id = "deleteCategory",
    summary = "Delete an exam category",
    description = "Rejected with 409 while any question set still belongs to the category.",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Category not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Category still in use (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_category(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    find_category(&txn, id).await?;

    let in_use = question_set::Entity::find()
        .filter(question_set::Column::CategoryId.eq(id))
        .count(&txn)
        .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category is used by {in_use} question set(s)"
        )));
    }

    exam_category::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(Json(MessageBody::new("Category deleted")))
}

// ---- question sets ----

#[utoipa::path(
    get,
    path = "/sets",
    tag = "Training",
    operation_id = "listQuestionSets",
    summary = "List question sets",
    description = "Newest first. Filter by category and/or active state.",
    params(SetListQuery),
    responses(
        (status = 200, description = "Page of question sets", body = ApiResponse<Paginated<SetResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_sets(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SetListQuery>,
) -> Result<Json<ApiResponse<Paginated<SetResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = question_set::Entity::find();
    if let Some(category_id) = query.category_id {
        select = select.filter(question_set::Column::CategoryId.eq(category_id));
    }
    if query.active_only.unwrap_or(false) {
        select = select.filter(question_set::Column::IsActive.eq(true));
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_desc(question_set::Column::CreatedAt)
        .order_by_desc(question_set::Column::Id)
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
    post,
    path = "/sets",
    tag = "Training",
    operation_id = "createQuestionSet",
    summary = "Create a question set",
    request_body = CreateSetRequest,
    responses(
        (status = 201, description = "Question set created", body = ApiResponse<SetResponse>),
        (status = 400, description = "Validation error or unknown category (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(name = %payload.name))]
pub async fn create_set(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_set(&payload)?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state.db, category_id).await?;
    }

    let model = insert_set(
        &state.db,
        payload.name.trim(),
        normalize_optional(payload.description),
        payload.category_id,
        payload.is_active.unwrap_or(true),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SetResponse::from(model))),
    ))
}

#[utoipa::path(
    get,
    path = "/sets/{id}",
    tag = "Training",
    operation_id = "getQuestionSet",
    summary = "Get a question set",
    params(("id" = i32, Path, description = "Question set ID")),
    responses(
        (status = 200, description = "Question set", body = ApiResponse<SetResponse>),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_set(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SetResponse>>, AppError> {
    let model = find_set(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    put,
    path = "/sets/{id}",
    tag = "Training",
    operation_id = "updateQuestionSet",
    summary = "Update a question set",
    description = "Only provided fields are modified; `null` clears `description` or `category_id`.",
    params(("id" = i32, Path, description = "Question set ID")),
    request_body = UpdateSetRequest,
    responses(
        (status = 200, description = "Question set updated", body = ApiResponse<SetResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_set(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateSetRequest>,
) -> Result<Json<ApiResponse<SetResponse>>, AppError> {
    validate_update_set(&payload)?;

    let existing = find_set(&state.db, id).await?;
    if payload == UpdateSetRequest::default() {
        return Ok(Json(ApiResponse::ok(existing.into())));
    }
    if let Some(Some(category_id)) = payload.category_id {
        ensure_category_exists(&state.db, category_id).await?;
    }

    let mut active: question_set::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(normalize_optional(description));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    delete,
    path = "/sets/{id}",
    tag = "Training",
    operation_id = "deleteQuestionSet",
    summary = "Delete a question set",
    description = "Deletes the set and its questions in one transaction. \
        Returns 409 CONFLICT while training records reference the set.",
    params(("id" = i32, Path, description = "Question set ID")),
    responses(
        (status = 200, description = "Question set deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Set has training records (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_set(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    find_set(&txn, id).await?;

    let records = training_record::Entity::find()
        .filter(training_record::Column::SetId.eq(id))
        .count(&txn)
        .await?;
    if records > 0 {
        return Err(AppError::Conflict(format!(
            "Cannot delete question set with {records} training record(s)"
        )));
    }

    let removed = question::Entity::delete_many()
        .filter(question::Column::SetId.eq(id))
        .exec(&txn)
        .await?;
    question_set::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(questions = removed.rows_affected, "Question set deleted");
    Ok(Json(MessageBody::new("Question set deleted")))
}

#[utoipa::path(
    get,
    path = "/sets/{id}/questions",
    tag = "Training",
    operation_id = "getExamQuestions",
    summary = "Get a set's questions for taking the exam",
    description = "Answers and explanations are withheld; grading happens on submission.",
    params(("id" = i32, Path, description = "Question set ID")),
    responses(
        (status = 200, description = "Set with its questions", body = ApiResponse<ExamResponse>),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn exam_questions(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ExamResponse>>, AppError> {
    let set = find_set(&state.db, id).await?;
    let questions = questions_of(&state.db, id).await?;

    Ok(Json(ApiResponse::ok(ExamResponse {
        set: set.into(),
        questions: questions.into_iter().map(Into::into).collect(),
    })))
}

#[utoipa::path(
    get,
    path = "/sets/{id}/stats",
    tag = "Training",
    operation_id = "getQuestionSetStats",
    summary = "Score statistics of a question set",
    description = "Attempts, average/max/min score and the number of passing attempts. \
        The pass mark is the `training_pass_score` system config (default 60).",
    params(("id" = i32, Path, description = "Question set ID")),
    responses(
        (status = 200, description = "Statistics", body = ApiResponse<SetStatsResponse>),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn set_stats(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SetStatsResponse>>, AppError> {
    find_set(&state.db, id).await?;

    let scores: Vec<i32> = training_record::Entity::find()
        .filter(training_record::Column::SetId.eq(id))
        .select_only()
        .column(training_record::Column::Score)
        .into_tuple()
        .all(&state.db)
        .await?;
    let pass = pass_score(&state.db).await?;

    Ok(Json(ApiResponse::ok(SetStatsResponse::from_scores(
        id, &scores, pass,
    ))))
}

// ---- training records ----

#[utoipa::path(
    post,
    path = "/records",
    tag = "Training",
    operation_id = "submitTrainingRecord",
    summary = "Submit a completed exam",
    description = "Grades the answers against the stored questions and records the attempt. \
        `score = round(correct * 100 / total)`. Unanswered or invalid letters count as wrong.",
    request_body = SubmitRecordRequest,
    responses(
        (status = 201, description = "Attempt graded and stored", body = ApiResponse<SubmitRecordResponse>),
        (status = 400, description = "Validation error, inactive or empty set (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, client_ip, payload), fields(set_id = payload.set_id))]
pub async fn submit_record(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    AppJson(payload): AppJson<SubmitRecordRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_submit_record(&payload)?;

    let set = find_set(&state.db, payload.set_id).await?;
    if !set.is_active {
        return Err(AppError::Validation("Question set is not active".into()));
    }
    let questions = questions_of(&state.db, set.id).await?;
    if questions.is_empty() {
        return Err(AppError::Validation("Question set has no questions".into()));
    }

    let grade = grade(&questions, &payload.answers);
    let pass = pass_score(&state.db).await?;
    let answers = serde_json::to_value(&payload.answers)
        .map_err(|e| AppError::Internal(format!("Failed to encode answers: {e}")))?;

    let now = chrono::Utc::now();
    let record = training_record::ActiveModel {
        employee_name: Set(payload.employee_name.trim().to_string()),
        set_id: Set(set.id),
        score: Set(grade.score),
        total_questions: Set(grade.total),
        correct_count: Set(grade.correct),
        answers: Set(answers),
        started_at: Set(payload.started_at),
        completed_at: Set(now),
        ip_address: Set(client_ip),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    debug!(record_id = record.id, score = grade.score, "Training record stored");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SubmitRecordResponse {
            record_id: record.id,
            score: grade.score,
            total_questions: grade.total,
            correct_count: grade.correct,
            passed: grade.score >= pass,
            results: grade.results,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/records",
    tag = "Training",
    operation_id = "listTrainingRecords",
    summary = "List training records",
    description = "Newest first. `employee_name` is a case-insensitive substring match.",
    params(RecordListQuery),
    responses(
        (status = 200, description = "Page of records", body = ApiResponse<Paginated<RecordResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_records(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RecordListQuery>,
) -> Result<Json<ApiResponse<Paginated<RecordResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = training_record::Entity::find();
    if let Some(ref name) = query.employee_name {
        let term = escape_like(name.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(training_record::Column::EmployeeName)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }
    if let Some(set_id) = query.set_id {
        select = select.filter(training_record::Column::SetId.eq(set_id));
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_desc(training_record::Column::CreatedAt)
        .order_by_desc(training_record::Column::Id)
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
    path = "/records/{id}",
    tag = "Training",
    operation_id = "getTrainingRecord",
    summary = "Get a training record",
    params(("id" = i32, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record", body = ApiResponse<RecordResponse>),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<RecordResponse>>, AppError> {
    let record = training_record::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Training record not found".into()))?;
    Ok(Json(ApiResponse::ok(record.into())))
}

#[utoipa::path(
    delete,
    path = "/records/{id}",
    tag = "Training",
    operation_id = "deleteTrainingRecord",
    summary = "Delete a training record",
    params(("id" = i32, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Record not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_record(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let result = training_record::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Training record not found".into()));
    }
    Ok(Json(MessageBody::new("Training record deleted")))
}

// ---- helpers shared with the question admin handlers ----

pub(crate) async fn find_set<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<question_set::Model, AppError> {
    question_set::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Question set not found".into()))
}

pub(crate) async fn insert_set<C: ConnectionTrait>(
    db: &C,
    name: &str,
    description: Option<String>,
    category_id: Option<i32>,
    is_active: bool,
) -> Result<question_set::Model, AppError> {
    let now = chrono::Utc::now();
    let model = question_set::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description),
        category_id: Set(category_id),
        total_questions: Set(0),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model)
}

pub(crate) async fn ensure_category_exists<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<(), AppError> {
    let exists = exam_category::Entity::find_by_id(id).count(db).await? > 0;
    if !exists {
        return Err(AppError::Validation(format!("Category {id} does not exist")));
    }
    Ok(())
}

/// Recount the questions of a set and store the result in `total_questions`.
pub(crate) async fn refresh_total_questions<C: ConnectionTrait>(
    db: &C,
    set_id: i32,
) -> Result<i32, AppError> {
    let count = question::Entity::find()
        .filter(question::Column::SetId.eq(set_id))
        .count(db)
        .await?;
    let total = i32::try_from(count)
        .map_err(|_| AppError::Internal(format!("Question count overflow for set {set_id}")))?;

    question_set::Entity::update_many()
        .col_expr(question_set::Column::TotalQuestions, Expr::value(total))
        .col_expr(
            question_set::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(question_set::Column::Id.eq(set_id))
        .exec(db)
        .await?;
    Ok(total)
}

async fn questions_of<C: ConnectionTrait>(
    db: &C,
    set_id: i32,
) -> Result<Vec<question::Model>, AppError> {
    Ok(question::Entity::find()
        .filter(question::Column::SetId.eq(set_id))
        .order_by_asc(question::Column::QuestionNumber)
        .order_by_asc(question::Column::Id)
        .all(db)
        .await?)
}

async fn find_category<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<exam_category::Model, AppError> {
    exam_category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".into()))
}

async fn next_category_order<C: ConnectionTrait>(db: &C) -> Result<i32, AppError> {
    let max: Option<i32> = exam_category::Entity::find()
        .select_only()
        .column_as(exam_category::Column::SortOrder.max(), "max_order")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    Ok(max.map_or(0, |m| m.saturating_add(1)))
}

fn category_conflict(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            debug!("Category name collision caught on write");
            AppError::Conflict("Category name already exists".into())
        }
        _ => AppError::from(e),
    }
}
