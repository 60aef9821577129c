use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::feature_item::ItemStatus;
use crate::entity::{feature_item, feature_module, project, project_phase};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AdminUser;
use crate::extractors::json::AppJson;
use crate::models::progress::*;
use crate::models::shared::{ApiResponse, MessageBody, normalize_optional};
use crate::state::AppState;

// ---- projects ----

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Project Progress",
    operation_id = "listProjects",
    summary = "List projects with rolled-up progress",
    description = "Newest first. `progress` is the rounded mean of the phase progress values.",
    responses((status = 200, description = "Projects", body = ApiResponse<Vec<ProjectSummary>>)),
)]
#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProjectSummary>>>, AppError> {
    let projects = project::Entity::find()
        .order_by_desc(project::Column::CreatedAt)
        .order_by_desc(project::Column::Id)
        .all(&state.db)
        .await?;
    if projects.is_empty() {
        return Ok(Json(ApiResponse::ok(vec![])));
    }

    let project_ids: Vec<i32> = projects.iter().map(|p| p.id).collect();
    let phases = project_phase::Entity::find()
        .filter(project_phase::Column::ProjectId.is_in(project_ids))
        .all(&state.db)
        .await?;
    let (modules, items) = load_descendants(&state.db, &phases).await?;

    let mut phases_by_project: HashMap<i32, Vec<project_phase::Model>> = HashMap::new();
    for phase in phases {
        phases_by_project
            .entry(phase.project_id)
            .or_default()
            .push(phase);
    }
    let mut modules_by_phase: HashMap<i32, Vec<feature_module::Model>> = HashMap::new();
    for module in modules {
        modules_by_phase
            .entry(module.phase_id)
            .or_default()
            .push(module);
    }
    let mut items_by_module: HashMap<i32, Vec<feature_item::Model>> = HashMap::new();
    for item in items {
        items_by_module.entry(item.module_id).or_default().push(item);
    }

    let summaries = projects
        .into_iter()
        .map(|p| {
            let phases = phases_by_project.remove(&p.id).unwrap_or_default();
            let modules: Vec<feature_module::Model> = phases
                .iter()
                .flat_map(|ph| modules_by_phase.remove(&ph.id).unwrap_or_default())
                .collect();
            let items: Vec<feature_item::Model> = modules
                .iter()
                .flat_map(|m| items_by_module.remove(&m.id).unwrap_or_default())
                .collect();
            build_tree(p, phases, modules, items).project
        })
        .collect();

    Ok(Json(ApiResponse::ok(summaries)))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Project Progress",
    operation_id = "createProject",
    summary = "Create a project",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ApiResponse<ProjectSummary>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(name = %payload.name))]
pub async fn create_project(
    _admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_project(&payload)?;

    let now = chrono::Utc::now();
    let model = project::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(normalize_optional(payload.description)),
        owner: Set(normalize_optional(payload.owner)),
        start_date: Set(payload.start_date),
        target_date: Set(payload.target_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(summarize(model, 0, 0))),
    ))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Project Progress",
    operation_id = "getProject",
    summary = "Get a project with its phases, modules and items",
    description = "Every level carries its progress: items their own, modules the mean of their items, \
        phases the mean of their modules and the project the mean of its phases.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project tree", body = ApiResponse<ProjectDetail>),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ProjectDetail>>, AppError> {
    let project = find_project(&state.db, id).await?;
    let phases = project_phase::Entity::find()
        .filter(project_phase::Column::ProjectId.eq(id))
        .order_by_asc(project_phase::Column::SortOrder)
        .order_by_asc(project_phase::Column::Id)
        .all(&state.db)
        .await?;
    let (modules, items) = load_descendants(&state.db, &phases).await?;

    Ok(Json(ApiResponse::ok(build_tree(
        project, phases, modules, items,
    ))))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Project Progress",
    operation_id = "updateProject",
    summary = "Update a project",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ApiResponse<ProjectSummary>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_project(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateProjectRequest>,
) -> Result<Json<ApiResponse<ProjectSummary>>, AppError> {
    let existing = find_project(&state.db, id).await?;
    validate_update_project(&payload, &existing)?;

    let mut active: project::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(normalize_optional(description));
    }
    if let Some(owner) = payload.owner {
        active.owner = Set(normalize_optional(owner));
    }
    if let Some(start_date) = payload.start_date {
        active.start_date = Set(start_date);
    }
    if let Some(target_date) = payload.target_date {
        active.target_date = Set(target_date);
    }
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    let phases = project_phase::Entity::find()
        .filter(project_phase::Column::ProjectId.eq(id))
        .all(&state.db)
        .await?;
    let (modules, items) = load_descendants(&state.db, &phases).await?;
    Ok(Json(ApiResponse::ok(
        build_tree(model, phases, modules, items).project,
    )))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Project Progress",
    operation_id = "deleteProject",
    summary = "Delete a project and everything under it",
    description = "Items, modules, phases and the project are removed in one transaction.",
    params(("id" = i32, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Project deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_project(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    find_project(&txn, id).await?;

    let phase_ids: Vec<i32> = project_phase::Entity::find()
        .select_only()
        .column(project_phase::Column::Id)
        .filter(project_phase::Column::ProjectId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;
    delete_phases(&txn, phase_ids).await?;
    project::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!("Project deleted");
    Ok(Json(MessageBody::new("Project deleted")))
}

// ---- phases ----

#[utoipa::path(
    post,
    path = "/projects/{id}/phases",
    tag = "Project Progress",
    operation_id = "createPhase",
    summary = "Add a phase to a project",
    params(("id" = i32, Path, description = "Project ID")),
    request_body = CreateNodeRequest,
    responses(
        (status = 201, description = "Phase created", body = ApiResponse<PhaseNode>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Project not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(project_id))]
pub async fn create_phase(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
    AppJson(payload): AppJson<CreateNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_node(&payload)?;
    find_project(&state.db, project_id).await?;

    let sort_order = match payload.sort_order {
        Some(s) => s,
        None => {
            let max: Option<i32> = project_phase::Entity::find()
                .filter(project_phase::Column::ProjectId.eq(project_id))
                .select_only()
                .column_as(project_phase::Column::SortOrder.max(), "max_order")
                .into_tuple::<Option<i32>>()
                .one(&state.db)
                .await?
                .flatten();
            next_order(max)
        }
    };

    let now = chrono::Utc::now();
    let model = project_phase::ActiveModel {
        project_id: Set(project_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(normalize_optional(payload.description)),
        sort_order: Set(sort_order),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(PhaseNode::new(model, vec![]))),
    ))
}

#[utoipa::path(
    put,
    path = "/phases/{id}",
    tag = "Project Progress",
    operation_id = "updatePhase",
    summary = "Update a phase",
    params(("id" = i32, Path, description = "Phase ID")),
    request_body = UpdateNodeRequest,
    responses(
        (status = 200, description = "Phase updated", body = ApiResponse<PhaseNode>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Phase not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_phase(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateNodeRequest>,
) -> Result<Json<ApiResponse<PhaseNode>>, AppError> {
    validate_update_node(&payload)?;

    let existing = find_phase(&state.db, id).await?;
    let model = if payload == UpdateNodeRequest::default() {
        existing
    } else {
        let mut active: project_phase::ActiveModel = existing.into();
        if let Some(name) = payload.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = payload.description {
            active.description = Set(normalize_optional(description));
        }
        if let Some(sort_order) = payload.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(chrono::Utc::now());
        active.update(&state.db).await?
    };

    let (modules, items) = load_descendants(&state.db, std::slice::from_ref(&model)).await?;
    let mut items_by_module: HashMap<i32, Vec<ItemResponse>> = HashMap::new();
    for item in items {
        items_by_module
            .entry(item.module_id)
            .or_default()
            .push(item.into());
    }
    let modules = modules
        .into_iter()
        .map(|m| {
            let items = items_by_module.remove(&m.id).unwrap_or_default();
            ModuleNode::new(m, items)
        })
        .collect();

    Ok(Json(ApiResponse::ok(PhaseNode::new(model, modules))))
}

#[utoipa::path(
    delete,
    path = "/phases/{id}",
    tag = "Project Progress",
    operation_id = "deletePhase",
    summary = "Delete a phase with its modules and items",
    params(("id" = i32, Path, description = "Phase ID")),
    responses(
        (status = 200, description = "Phase deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Phase not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_phase(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    find_phase(&txn, id).await?;
    delete_phases(&txn, vec![id]).await?;
    txn.commit().await?;
    Ok(Json(MessageBody::new("Phase deleted")))
}

// ---- modules ----

#[utoipa::path(
    post,
    path = "/phases/{id}/modules",
    tag = "Project Progress",
    operation_id = "createModule",
    summary = "Add a feature module to a phase",
    params(("id" = i32, Path, description = "Phase ID")),
    request_body = CreateNodeRequest,
    responses(
        (status = 201, description = "Module created", body = ApiResponse<ModuleNode>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Phase not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(phase_id))]
pub async fn create_module(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(phase_id): Path<i32>,
    AppJson(payload): AppJson<CreateNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_node(&payload)?;
    find_phase(&state.db, phase_id).await?;

    let sort_order = match payload.sort_order {
        Some(s) => s,
        None => {
            let max: Option<i32> = feature_module::Entity::find()
                .filter(feature_module::Column::PhaseId.eq(phase_id))
                .select_only()
                .column_as(feature_module::Column::SortOrder.max(), "max_order")
                .into_tuple::<Option<i32>>()
                .one(&state.db)
                .await?
                .flatten();
            next_order(max)
        }
    };

    let now = chrono::Utc::now();
    let model = feature_module::ActiveModel {
        phase_id: Set(phase_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(normalize_optional(payload.description)),
        sort_order: Set(sort_order),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ModuleNode::new(model, vec![]))),
    ))
}

#[utoipa::path(
    put,
    path = "/modules/{id}",
    tag = "Project Progress",
    operation_id = "updateModule",
    summary = "Update a feature module",
    params(("id" = i32, Path, description = "Module ID")),
    request_body = UpdateNodeRequest,
    responses(
        (status = 200, description = "Module updated", body = ApiResponse<ModuleNode>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Module not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_module(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateNodeRequest>,
) -> Result<Json<ApiResponse<ModuleNode>>, AppError> {
    validate_update_node(&payload)?;

    let existing = find_module(&state.db, id).await?;
    let model = if payload == UpdateNodeRequest::default() {
        existing
    } else {
        let mut active: feature_module::ActiveModel = existing.into();
        if let Some(name) = payload.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = payload.description {
            active.description = Set(normalize_optional(description));
        }
        if let Some(sort_order) = payload.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(chrono::Utc::now());
        active.update(&state.db).await?
    };

    let items = items_of(&state.db, id).await?;
    Ok(Json(ApiResponse::ok(ModuleNode::new(
        model,
        items.into_iter().map(Into::into).collect(),
    ))))
}

#[utoipa::path(
    delete,
    path = "/modules/{id}",
    tag = "Project Progress",
    operation_id = "deleteModule",
    summary = "Delete a feature module with its items",
    params(("id" = i32, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Module deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Module not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_module(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let txn = state.db.begin().await?;
    find_module(&txn, id).await?;
    feature_item::Entity::delete_many()
        .filter(feature_item::Column::ModuleId.eq(id))
        .exec(&txn)
        .await?;
    feature_module::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(Json(MessageBody::new("Module deleted")))
}

// ---- items ----

#[utoipa::path(
    post,
    path = "/modules/{id}/items",
    tag = "Project Progress",
    operation_id = "createItem",
    summary = "Add a feature item to a module",
    description = "`status` defaults to `pending`. A `completed` item is stored with progress 100 \
        and a `pending` one with 0 regardless of the requested progress.",
    params(("id" = i32, Path, description = "Module ID")),
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Module not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(module_id))]
pub async fn create_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(module_id): Path<i32>,
    AppJson(payload): AppJson<CreateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_item(&payload)?;
    find_module(&state.db, module_id).await?;

    let sort_order = match payload.sort_order {
        Some(s) => s,
        None => {
            let max: Option<i32> = feature_item::Entity::find()
                .filter(feature_item::Column::ModuleId.eq(module_id))
                .select_only()
                .column_as(feature_item::Column::SortOrder.max(), "max_order")
                .into_tuple::<Option<i32>>()
                .one(&state.db)
                .await?
                .flatten();
            next_order(max)
        }
    };

    let status = payload.status.unwrap_or(ItemStatus::Pending);
    let now = chrono::Utc::now();
    let model = feature_item::ActiveModel {
        module_id: Set(module_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(normalize_optional(payload.description)),
        status: Set(status),
        progress: Set(progress_for_status(status, payload.progress, 0)),
        assignee: Set(normalize_optional(payload.assignee)),
        sort_order: Set(sort_order),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(ItemResponse::from(model))),
    ))
}

#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "Project Progress",
    operation_id = "updateItem",
    summary = "Update a feature item",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id))]
pub async fn update_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateItemRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, AppError> {
    validate_update_item(&payload)?;

    let existing = find_item(&state.db, id).await?;
    let status = payload.status.unwrap_or(existing.status);
    let progress = progress_for_status(status, payload.progress, existing.progress);

    let mut active: feature_item::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(normalize_optional(description));
    }
    if let Some(assignee) = payload.assignee {
        active.assignee = Set(normalize_optional(assignee));
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    active.status = Set(status);
    active.progress = Set(progress);
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    patch,
    path = "/items/{id}/status",
    tag = "Project Progress",
    operation_id = "updateItemStatus",
    summary = "Change the status of a feature item",
    description = "`completed` forces progress to 100 and `pending` to 0. \
        Other states take `progress` when given and keep the current value otherwise.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ItemResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin, payload), fields(id, status = ?payload.status))]
pub async fn update_item_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateItemStatusRequest>,
) -> Result<Json<ApiResponse<ItemResponse>>, AppError> {
    validate_item_status(&payload)?;

    let existing = find_item(&state.db, id).await?;
    let progress = progress_for_status(payload.status, payload.progress, existing.progress);

    let mut active: feature_item::ActiveModel = existing.into();
    active.status = Set(payload.status);
    active.progress = Set(progress);
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(ApiResponse::ok(model.into())))
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "Project Progress",
    operation_id = "deleteItem",
    summary = "Delete a feature item",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item deleted", body = MessageBody),
        (status = 401, description = "Admin login required (UNAUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, _admin), fields(id))]
pub async fn delete_item(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageBody>, AppError> {
    let result = feature_item::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Item not found".into()));
    }
    Ok(Json(MessageBody::new("Item deleted")))
}

// ---- helpers ----

/// Modules of the given phases and the items of those modules, in display order.
async fn load_descendants<C: ConnectionTrait>(
    db: &C,
    phases: &[project_phase::Model],
) -> Result<(Vec<feature_module::Model>, Vec<feature_item::Model>), AppError> {
    if phases.is_empty() {
        return Ok((vec![], vec![]));
    }
    let modules = feature_module::Entity::find()
        .filter(feature_module::Column::PhaseId.is_in(phases.iter().map(|p| p.id)))
        .order_by_asc(feature_module::Column::SortOrder)
        .order_by_asc(feature_module::Column::Id)
        .all(db)
        .await?;
    if modules.is_empty() {
        return Ok((modules, vec![]));
    }
    let items = feature_item::Entity::find()
        .filter(feature_item::Column::ModuleId.is_in(modules.iter().map(|m| m.id)))
        .order_by_asc(feature_item::Column::SortOrder)
        .order_by_asc(feature_item::Column::Id)
        .all(db)
        .await?;
    Ok((modules, items))
}

/// Delete phases with everything under them, children first.
async fn delete_phases<C: ConnectionTrait>(db: &C, phase_ids: Vec<i32>) -> Result<(), AppError> {
    if phase_ids.is_empty() {
        return Ok(());
    }
    let module_ids: Vec<i32> = feature_module::Entity::find()
        .select_only()
        .column(feature_module::Column::Id)
        .filter(feature_module::Column::PhaseId.is_in(phase_ids.clone()))
        .into_tuple()
        .all(db)
        .await?;

    if !module_ids.is_empty() {
        feature_item::Entity::delete_many()
            .filter(feature_item::Column::ModuleId.is_in(module_ids.clone()))
            .exec(db)
            .await?;
        feature_module::Entity::delete_many()
            .filter(feature_module::Column::Id.is_in(module_ids))
            .exec(db)
            .await?;
    }
    project_phase::Entity::delete_many()
        .filter(project_phase::Column::Id.is_in(phase_ids))
        .exec(db)
        .await?;
    Ok(())
}

async fn items_of<C: ConnectionTrait>(
    db: &C,
    module_id: i32,
) -> Result<Vec<feature_item::Model>, AppError> {
    Ok(feature_item::Entity::find()
        .filter(feature_item::Column::ModuleId.eq(module_id))
        .order_by_asc(feature_item::Column::SortOrder)
        .order_by_asc(feature_item::Column::Id)
        .all(db)
        .await?)
}

fn next_order(max: Option<i32>) -> i32 {
    max.map_or(0, |m| m.saturating_add(1))
}

async fn find_project<C: ConnectionTrait>(db: &C, id: i32) -> Result<project::Model, AppError> {
    project::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

async fn find_phase<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<project_phase::Model, AppError> {
    project_phase::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Phase not found".into()))
}

async fn find_module<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<feature_module::Model, AppError> {
    feature_module::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Module not found".into()))
}

async fn find_item<C: ConnectionTrait>(db: &C, id: i32) -> Result<feature_item::Model, AppError> {
    feature_item::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}
