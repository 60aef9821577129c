use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{question, training_record};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::handlers::training::{
    ensure_category_exists, find_set, insert_set, refresh_total_questions,
};
use crate::models::question::*;
use crate::models::shared::{
    ApiResponse, MessageBody, Paginated, Pagination, escape_like, normalize_optional,
    resolve_page,
};
use crate::services::question_parser::{ParseResult, ParsedQuestion, parse_questions};
use crate::state::AppState;

/// Question rows per INSERT; twelve bound columns each keeps a statement under SQLite's limit.
const CHUNK: usize = 200;

pub fn question_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_HTML_BYTES + 64 * 1024)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Questions",
    operation_id = "listQuestions",
    summary = "List questions",
    description = "Ordered by set, then question number. `search` matches the question text case-insensitively.",
    params(QuestionListQuery),
    responses(
        (status = 200, description = "Page of questions", body = ApiResponse<Paginated<QuestionResponse>>),
        (status = 400, description = "Invalid query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, query))]
pub async fn list_questions(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<QuestionListQuery>,
) -> Result<Json<ApiResponse<Paginated<QuestionResponse>>>, AppError> {
    let (page, limit, offset) = resolve_page(query.page, query.limit);

    let mut select = question::Entity::find();
    if let Some(set_id) = query.set_id {
        select = select.filter(question::Column::SetId.eq(set_id));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(question::Column::QuestionText)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select.clone().count(&state.db).await?;
    let items = select
        .order_by_asc(question::Column::SetId)
        .order_by_asc(question::Column::QuestionNumber)
        .order_by_asc(question::Column::Id)
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
    path = "/",
    tag = "Questions",
    operation_id = "createQuestion",
    summary = "Add a question to a set",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = ApiResponse<QuestionResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(set_id = payload.set_id))]
pub async fn create_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_question(&payload)?;

    let txn = state.db.begin().await?;
    find_set(&txn, payload.set_id).await?;

    let question_number = match payload.question_number {
        Some(n) => n,
        None => {
            let max = max_question_number(&txn, payload.set_id).await?;
            next_question_number(max, 1)?
        }
    };
    let now = chrono::Utc::now();
    let model = question::ActiveModel {
        set_id: Set(payload.set_id),
        question_number: Set(question_number),
        section: Set(normalize_optional(payload.section)),
        question_text: Set(payload.question_text.trim().to_string()),
        option_a: Set(payload.option_a.trim().to_string()),
        option_b: Set(payload.option_b.trim().to_string()),
        option_c: Set(payload.option_c.trim().to_string()),
        option_d: Set(payload.option_d.trim().to_string()),
        correct_answer: Set(payload.correct_answer),
        explanation: Set(normalize_optional(payload.explanation)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    refresh_total_questions(&txn, payload.set_id).await?;
    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(QuestionResponse::from(model))),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Questions",
    operation_id = "getQuestion",
    summary = "Get a question with its answer",
    params(("id" = i32, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question", body = ApiResponse<QuestionResponse>),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn get_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<QuestionResponse>>, AppError> {
    let model = find_question(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Questions",
    operation_id = "updateQuestion",
    summary = "Update a question",
    params(("id" = i32, Path, description = "Question ID")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = ApiResponse<QuestionResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateQuestionRequest>,
) -> Result<Json<ApiResponse<QuestionResponse>>, AppError> {
    validate_update_question(&payload)?;

    let existing = find_question(&state.db, id).await?;
    if payload == UpdateQuestionRequest::default() {
        return Ok(Json(ApiResponse::ok(existing.into())));
    }

    let mut active: question::ActiveModel = existing.into();
    if let Some(n) = payload.question_number {
        active.question_number = Set(n);
    }
    if let Some(section) = payload.section {
        active.section = Set(normalize_optional(section));
    }
    if let Some(text) = payload.question_text {
        active.question_text = Set(text.trim().to_string());
    }
    if let Some(v) = payload.option_a {
        active.option_a = Set(v.trim().to_string());
    }
    if let Some(v) = payload.option_b {
        active.option_b = Set(v.trim().to_string());
    }
    if let Some(v) = payload.option_c {
        active.option_c = Set(v.trim().to_string());
    }
    if let Some(v) = payload.option_d {
        active.option_d = Set(v.trim().to_string());
    }
    if let Some(answer) = payload.correct_answer {
        active.correct_answer = Set(answer);
    }
    if let Some(explanation) = payload.explanation {
        active.explanation = Set(normalize_optional(explanation));
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Questions",
    operation_id = "deleteQuestion",
    summary = "Delete a question",
    params(("id" = i32, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Question deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_question(&txn, id).await?;
    question::Entity::delete_by_id(id).exec(&txn).await?;
    refresh_total_questions(&txn, existing.set_id).await?;
    txn.commit().await?;
    Ok(Json(MessageBody::new("Question deleted")))
}

#[utoipa::path(
    post,
    path = "/parse",
    tag = "Questions",
    operation_id = "parseQuestions",
    summary = "Preview how an HTML document parses",
    description = "Runs the question parser without writing anything.",
    request_body = ParseRequest,
    responses(
        (status = 200, description = "Parse result", body = ApiResponse<ParseResult>),
        (status = 400, description = "Empty or oversized html (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(_admin, payload), fields(bytes = payload.html.len()))]
pub async fn parse(
    _admin: AdminUser,
    AppJson(payload): AppJson<ParseRequest>,
) -> Result<Json<ApiResponse<ParseResult>>, AppError> {
    validate_html(&payload.html)?;
    Ok(Json(ApiResponse::ok(parse_questions(&payload.html))))
}

#[utoipa::path(
    post,
    path = "/import",
    tag = "Questions",
    operation_id = "importQuestions",
    summary = "Parse HTML and store the questions",
    description = "Imports into the set `set_id`, or creates a set named `set_name`. \
        Questions are appended after the set's highest number unless `replace` is set, \
        in which case the existing questions are removed first (409 while training records exist). \
        All writes happen in one transaction.",
    request_body = ImportQuestionsRequest,
    responses(
        (status = 201, description = "Questions imported", body = ApiResponse<ImportQuestionsResponse>),
        (status = 400, description = "Nothing parsed or invalid target (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Replace blocked by training records (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(set_id = ?payload.set_id))]
pub async fn import(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ImportQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = import_html(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

#[utoipa::path(
    post,
    path = "/import/upload",
    tag = "Questions",
    operation_id = "uploadQuestions",
    summary = "Import questions from an uploaded HTML file",
    description = "Multipart fields: `file` (required, UTF-8 HTML), `set_id` (required), \
        `replace` (optional, `true`/`false`). Behaves like `/import` with `set_id`.",
    request_body(content_type = "multipart/form-data", description = "HTML file and target set"),
    responses(
        (status = 201, description = "Questions imported", body = ApiResponse<ImportQuestionsResponse>),
        (status = 400, description = "Missing field or nothing parsed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Question set not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Replace blocked by training records (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, multipart))]
pub async fn upload(
    _admin: AdminUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut html: Option<String> = None;
    let mut set_id: Option<i32> = None;
    let mut replace = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| AppError::Validation("File must be UTF-8 encoded HTML".into()))?;
                html = Some(text);
            }
            Some("set_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read set_id: {e}")))?;
                set_id = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| AppError::Validation("set_id must be an integer".into()))?,
                );
            }
            Some("replace") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read replace: {e}")))?;
                replace = matches!(text.trim(), "true" | "1");
            }
            _ => {}
        }
    }

    let html = html.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let set_id = set_id.ok_or_else(|| AppError::Validation("Missing 'set_id' field".into()))?;

    let response = import_html(
        &state.db,
        ImportQuestionsRequest {
            html,
            set_id: Some(set_id),
            set_name: None,
            category_id: None,
            description: None,
            replace,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

async fn import_html(
    db: &DatabaseConnection,
    req: ImportQuestionsRequest,
) -> Result<ImportQuestionsResponse, AppError> {
    validate_html(&req.html)?;
    validate_import_target(req.set_id, req.set_name.as_deref())?;

    let parsed = parse_questions(&req.html);
    if !parsed.success {
        let detail = parsed
            .warnings
            .first()
            .map(|w| w.message.as_str())
            .unwrap_or("no questions found");
        return Err(AppError::Validation(format!(
            "No questions could be parsed: {detail}"
        )));
    }

    let txn = db.begin().await?;

    let (set, created_set) = match (req.set_id, req.set_name) {
        (Some(id), _) => (find_set(&txn, id).await?, false),
        (None, name) => {
            let name =
                name.ok_or_else(|| AppError::Validation("set_name is required".into()))?;
            if let Some(category_id) = req.category_id {
                ensure_category_exists(&txn, category_id).await?;
            }
            let set = insert_set(
                &txn,
                name.trim(),
                normalize_optional(req.description),
                req.category_id,
                true,
            )
            .await?;
            (set, true)
        }
    };

    let mut replaced = 0;
    let start = if req.replace && !created_set {
        let records = training_record::Entity::find()
            .filter(training_record::Column::SetId.eq(set.id))
            .count(&txn)
            .await?;
        if records > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot replace questions of a set with {records} training record(s)"
            )));
        }
        replaced = question::Entity::delete_many()
            .filter(question::Column::SetId.eq(set.id))
            .exec(&txn)
            .await?
            .rows_affected;
        0
    } else {
        max_question_number(&txn, set.id).await?
    };

    let imported = parsed.questions.len();
    next_question_number(start, imported)?;

    let now = chrono::Utc::now();
    let rows: Vec<_> = parsed
        .questions
        .into_iter()
        .map(|q| question_row(set.id, start, q, now))
        .collect();
    for chunk in rows.chunks(CHUNK) {
        question::Entity::insert_many(chunk.to_vec())
            .exec(&txn)
            .await?;
    }

    let total_questions = refresh_total_questions(&txn, set.id).await?;
    txn.commit().await?;

    info!(
        set_id = set.id,
        imported,
        replaced,
        warnings = parsed.warnings.len(),
        "Questions imported"
    );
    Ok(ImportQuestionsResponse {
        set_id: set.id,
        created_set,
        imported,
        replaced,
        total_questions,
        warnings: parsed.warnings,
    })
}

fn question_row(
    set_id: i32,
    offset: i32,
    q: ParsedQuestion,
    now: chrono::DateTime<chrono::Utc>,
) -> question::ActiveModel {
    question::ActiveModel {
        set_id: Set(set_id),
        question_number: Set(offset + q.question_number),
        section: Set(q.section),
        question_text: Set(q.question_text),
        option_a: Set(q.option_a),
        option_b: Set(q.option_b),
        option_c: Set(q.option_c),
        option_d: Set(q.option_d),
        correct_answer: Set(q.correct_answer),
        explanation: Set(q.explanation),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

async fn find_question<C: ConnectionTrait>(db: &C, id: i32) -> Result<question::Model, AppError> {
    question::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".into()))
}

/// Number of the last of `count` questions appended after `max`.
fn next_question_number(max: i32, count: usize) -> Result<i32, AppError> {
    i32::try_from(count)
        .ok()
        .and_then(|count| max.checked_add(count))
        .filter(|n| *n <= MAX_QUESTION_NUMBER)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Set would exceed {MAX_QUESTION_NUMBER} questions"
            ))
        })
}

async fn max_question_number<C: ConnectionTrait>(db: &C, set_id: i32) -> Result<i32, AppError> {
    let max: Option<i32> = question::Entity::find()
        .filter(question::Column::SetId.eq(set_id))
        .select_only()
        .column_as(question::Column::QuestionNumber.max(), "max_number")
        .into_tuple::<Option<i32>>()
        .one(db)
        .await?
        .flatten();
    Ok(max.unwrap_or(0))
}
