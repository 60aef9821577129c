use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "training_record")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub employee_name: String,

    pub set_id: i32,
    #[sea_orm(belongs_to, from = "set_id", to = "id")]
    pub question_set: HasOne<super::question_set::Entity>,

    pub score: i32, // 0-100
    pub total_questions: i32,
    pub correct_count: i32,
    /// Submitted answers as a JSON object of question id -> letter.
    #[sea_orm(column_type = "Json")]
    pub answers: Json,

    pub started_at: Option<DateTimeUtc>,
    pub completed_at: DateTimeUtc,
    pub ip_address: Option<String>,
    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
