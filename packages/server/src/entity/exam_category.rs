use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exam_category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>, // CSS color, e.g. "#1677ff"

    #[sea_orm(default_value = 0)]
    pub sort_order: i32,

    #[sea_orm(has_many)]
    pub question_sets: HasMany<super::question_set::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
