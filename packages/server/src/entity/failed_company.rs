use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "failed_company")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub import_id: i32,
    #[sea_orm(belongs_to, from = "import_id", to = "id")]
    pub import: HasOne<super::import_record::Entity>,

    pub row_number: i32, // 1-based position in the submitted batch
    pub company_name: Option<String>,
    pub reason: String,
    #[sea_orm(column_type = "Json")]
    pub raw_data: Json,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
