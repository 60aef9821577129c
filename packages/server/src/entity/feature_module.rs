use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feature_module")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub phase_id: i32,
    #[sea_orm(belongs_to, from = "phase_id", to = "id")]
    pub phase: HasOne<super::project_phase::Entity>,

    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(default_value = 0)]
    pub sort_order: i32,

    #[sea_orm(has_many)]
    pub items: HasMany<super::feature_item::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
