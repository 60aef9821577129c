use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    DeriveActiveEnum,
    EnumIter,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Every row was imported.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Some rows failed.
    #[sea_orm(string_value = "partial")]
    Partial,
    /// No row was imported.
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl ImportStatus {
    pub fn from_counts(success: i32, failed: i32) -> Self {
        match (success, failed) {
            (0, _) => Self::Failed,
            (_, 0) => Self::Completed,
            _ => Self::Partial,
        }
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "import_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub batch_id: String,
    pub file_name: Option<String>,
    pub total_rows: i32,
    pub success_count: i32,
    pub failed_count: i32,
    pub status: ImportStatus,

    #[sea_orm(has_many)]
    pub failures: HasMany<super::failed_company::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
