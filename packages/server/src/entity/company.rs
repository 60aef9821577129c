use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
    /// 18-character unified social credit code.
    pub credit_code: Option<String>,
    pub contact_person: Option<String>,
    pub contact_phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,
    pub category: Option<String>,

    /// Import batch that created this row. Cleared when the batch history is deleted.
    pub import_id: Option<i32>,
    #[sea_orm(belongs_to, from = "import_id", to = "id")]
    pub import: HasOne<super::import_record::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
