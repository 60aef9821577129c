use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::feature_item::ItemStatus;
use crate::entity::{feature_item, feature_module, project, project_phase};
use crate::error::AppError;

use super::shared::{double_option, validate_name, validate_percent};

/// Rounded mean of child progress values; 0 when there are none.
pub fn mean_progress<I>(values: I) -> i32
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0i64, 0i64), |(sum, count), v| (sum + i64::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i32
}

/// Progress stored for an item after a status change.
///
/// `completed` pins it to 100 and `pending` to 0; other states keep the
/// requested value, or the current one when none is given.
pub fn progress_for_status(status: ItemStatus, requested: Option<i32>, current: i32) -> i32 {
    match status {
        ItemStatus::Completed => 100,
        ItemStatus::Pending => 0,
        ItemStatus::InProgress | ItemStatus::Blocked => requested.unwrap_or(current),
    }
}

// ---- requests ----

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub owner: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub target_date: Option<Option<NaiveDate>>,
}

fn validate_dates(start: Option<NaiveDate>, target: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(start), Some(target)) = (start, target)
        && target < start
    {
        return Err(AppError::Validation(
            "target_date must not be before start_date".into(),
        ));
    }
    Ok(())
}

pub fn validate_create_project(req: &CreateProjectRequest) -> Result<(), AppError> {
    validate_name("name", &req.name, 200)?;
    validate_dates(req.start_date, req.target_date)
}

/// Validate an update against the dates it would produce.
pub fn validate_update_project(
    req: &UpdateProjectRequest,
    current: &project::Model,
) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name("name", name, 200)?;
    }
    let start = req.start_date.unwrap_or(current.start_date);
    let target = req.target_date.unwrap_or(current.target_date);
    validate_dates(start, target)
}

/// Shared body for phases and modules.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateNodeRequest {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to after the last sibling.
    pub sort_order: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub sort_order: Option<i32>,
}

fn validate_sort_order(sort_order: Option<i32>) -> Result<(), AppError> {
    if let Some(pos) = sort_order
        && pos < 0
    {
        return Err(AppError::Validation("sort_order must be >= 0".into()));
    }
    Ok(())
}

pub fn validate_create_node(req: &CreateNodeRequest) -> Result<(), AppError> {
    validate_name("name", &req.name, 200)?;
    validate_sort_order(req.sort_order)
}

pub fn validate_update_node(req: &UpdateNodeRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name("name", name, 200)?;
    }
    validate_sort_order(req.sort_order)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ItemStatus>,
    pub progress: Option<i32>,
    pub assignee: Option<String>,
    pub sort_order: Option<i32>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<ItemStatus>,
    pub progress: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub assignee: Option<Option<String>>,
    pub sort_order: Option<i32>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateItemStatusRequest {
    pub status: ItemStatus,
    pub progress: Option<i32>,
}

pub fn validate_create_item(req: &CreateItemRequest) -> Result<(), AppError> {
    validate_name("name", &req.name, 200)?;
    if let Some(p) = req.progress {
        validate_percent("progress", p)?;
    }
    validate_sort_order(req.sort_order)
}

pub fn validate_update_item(req: &UpdateItemRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name("name", name, 200)?;
    }
    if let Some(p) = req.progress {
        validate_percent("progress", p)?;
    }
    validate_sort_order(req.sort_order)
}

pub fn validate_item_status(req: &UpdateItemStatusRequest) -> Result<(), AppError> {
    if let Some(p) = req.progress {
        validate_percent("progress", p)?;
    }
    Ok(())
}

// ---- responses ----

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ItemResponse {
    pub id: i32,
    pub module_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: ItemStatus,
    pub progress: i32,
    pub assignee: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<feature_item::Model> for ItemResponse {
    fn from(m: feature_item::Model) -> Self {
        Self {
            id: m.id,
            module_id: m.module_id,
            name: m.name,
            description: m.description,
            status: m.status,
            progress: m.progress,
            assignee: m.assignee,
            sort_order: m.sort_order,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ModuleNode {
    pub id: i32,
    pub phase_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub progress: i32,
    pub items: Vec<ItemResponse>,
}

impl ModuleNode {
    pub fn new(m: feature_module::Model, items: Vec<ItemResponse>) -> Self {
        Self {
            progress: mean_progress(items.iter().map(|i| i.progress)),
            id: m.id,
            phase_id: m.phase_id,
            name: m.name,
            description: m.description,
            sort_order: m.sort_order,
            items,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PhaseNode {
    pub id: i32,
    pub project_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub progress: i32,
    pub modules: Vec<ModuleNode>,
}

impl PhaseNode {
    pub fn new(p: project_phase::Model, modules: Vec<ModuleNode>) -> Self {
        Self {
            progress: mean_progress(modules.iter().map(|m| m.progress)),
            id: p.id,
            project_id: p.project_id,
            name: p.name,
            description: p.description,
            sort_order: p.sort_order,
            modules,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProjectSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub progress: i32,
    pub phase_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectSummary,
    pub phases: Vec<PhaseNode>,
}

/// Assemble the full tree of a project, computing progress at every level.
///
/// Children are attached by parent id; rows whose parent is not in the
/// given slices are ignored.
pub fn build_tree(
    project: project::Model,
    phases: Vec<project_phase::Model>,
    modules: Vec<feature_module::Model>,
    items: Vec<feature_item::Model>,
) -> ProjectDetail {
    let mut items_by_module: HashMap<i32, Vec<ItemResponse>> = HashMap::new();
    for item in items {
        items_by_module
            .entry(item.module_id)
            .or_default()
            .push(item.into());
    }

    let mut modules_by_phase: HashMap<i32, Vec<ModuleNode>> = HashMap::new();
    for module in modules {
        let items = items_by_module.remove(&module.id).unwrap_or_default();
        modules_by_phase
            .entry(module.phase_id)
            .or_default()
            .push(ModuleNode::new(module, items));
    }

    let phases: Vec<PhaseNode> = phases
        .into_iter()
        .map(|phase| {
            let modules = modules_by_phase.remove(&phase.id).unwrap_or_default();
            PhaseNode::new(phase, modules)
        })
        .collect();

    let progress = mean_progress(phases.iter().map(|p| p.progress));
    ProjectDetail {
        project: summarize(project, progress, phases.len()),
        phases,
    }
}

pub fn summarize(p: project::Model, progress: i32, phase_count: usize) -> ProjectSummary {
    ProjectSummary {
        id: p.id,
        name: p.name,
        description: p.description,
        owner: p.owner,
        start_date: p.start_date,
        target_date: p.target_date,
        progress,
        phase_count,
        created_at: p.created_at,
        updated_at: p.updated_at,
    }
}
