use std::fmt;
use std::str::FromStr;

use sea_orm::entity::prelude::*;
use sea_orm::prelude::StringLen;
use serde::{Deserialize, Serialize};

/// One of the four answer letters.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(1))")]
pub enum AnswerOption {
    #[sea_orm(string_value = "A")]
    A,
    #[sea_orm(string_value = "B")]
    B,
    #[sea_orm(string_value = "C")]
    C,
    #[sea_orm(string_value = "D")]
    D,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            "D" | "d" => Ok(Self::D),
            other => Err(format!("Invalid answer option: {other}")),
        }
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub set_id: i32,
    #[sea_orm(belongs_to, from = "set_id", to = "id")]
    pub question_set: HasOne<super::question_set::Entity>,

    pub question_number: i32,
    pub section: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub question_text: String,
    #[sea_orm(column_type = "Text")]
    pub option_a: String,
    #[sea_orm(column_type = "Text")]
    pub option_b: String,
    #[sea_orm(column_type = "Text")]
    pub option_c: String,
    #[sea_orm(column_type = "Text")]
    pub option_d: String,
    pub correct_answer: AnswerOption,
    #[sea_orm(column_type = "Text", nullable)]
    pub explanation: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
