use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question_set")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// NULL for uncategorised sets.
    pub category_id: Option<i32>,
    #[sea_orm(belongs_to, from = "category_id", to = "id")]
    pub category: HasOne<super::exam_category::Entity>,

    /// Cached count of questions in this set, refreshed on every question write.
    #[sea_orm(default_value = 0)]
    pub total_questions: i32,
    pub is_active: bool,

    #[sea_orm(has_many)]
    pub questions: HasMany<super::question::Entity>,

    #[sea_orm(has_many)]
    pub records: HasMany<super::training_record::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
