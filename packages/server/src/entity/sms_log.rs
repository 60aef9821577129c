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
pub enum SmsStatus {
    #[sea_orm(string_value = "sent")]
    Sent,
    /// No gateway configured; the message was only logged.
    #[sea_orm(string_value = "dry_run")]
    DryRun,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sms_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub phone: String,
    pub template_code: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: SmsStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub error: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
