use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, OnConflict, SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{exam_category, question, system_config, training_record};
use crate::models::system_config::{DEFAULT_PASS_SCORE, TRAINING_PASS_SCORE};

/// Exam categories created on first start: (name, icon, color).
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("安全生产", "shield", "#f5222d"),
    ("消防安全", "fire", "#fa8c16"),
    ("职业健康", "heart", "#52c41a"),
    ("规章制度", "book", "#1677ff"),
];

/// Seed default exam categories and system-config keys. Existing rows are left alone.
pub async fn seed_defaults(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now();

    let mut categories_inserted = 0u32;
    for (position, &(name, icon, color)) in DEFAULT_CATEGORIES.iter().enumerate() {
        let model = exam_category::ActiveModel {
            name: Set(name.to_string()),
            icon: Set(Some(icon.to_string())),
            color: Set(Some(color.to_string())),
            sort_order: Set(position as i32),
            created_at: Set(now),
            ..Default::default()
        };

        let result = exam_category::Entity::insert(model)
            .on_conflict(
                OnConflict::column(exam_category::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => categories_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if categories_inserted > 0 {
        info!("Seeded {} exam categories", categories_inserted);
    }

    let pass_score = DEFAULT_PASS_SCORE.to_string();
    let defaults: [(&str, &str, &str); 3] = [
        ("site_name", "内部业务门户", "Title shown in the portal header"),
        (
            TRAINING_PASS_SCORE,
            pass_score.as_str(),
            "Minimum training score counted as a pass (0-100)",
        ),
        ("sms_daily_limit", "100", "Soft limit of SMS sends per day"),
    ];

    let mut configs_inserted = 0u32;
    for (key, value, description) in defaults {
        let model = system_config::ActiveModel {
            config_key: Set(key.to_string()),
            config_value: Set(value.to_string()),
            description: Set(Some(description.to_string())),
            updated_at: Set(now),
        };

        let result = system_config::Entity::insert(model)
            .on_conflict(
                OnConflict::column(system_config::Column::ConfigKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(n) if n > 0 => configs_inserted += 1,
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if configs_inserted > 0 {
        info!("Seeded {} system config entries", configs_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup. A failure is logged and skipped.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Record lists and stats filter by set and sort by time.
    let by_set_time = Index::create()
        .if_not_exists()
        .name("idx_training_record_set_created")
        .table(training_record::Entity)
        .col(training_record::Column::SetId)
        .col(training_record::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_training_record_set_created", &by_set_time).await;

    // Exam view and numbering: questions of a set in order.
    let by_set_number = Index::create()
        .if_not_exists()
        .name("idx_question_set_number")
        .table(question::Entity)
        .col(question::Column::SetId)
        .col(question::Column::QuestionNumber)
        .to_owned();
    create_index(db, "idx_question_set_number", &by_set_number).await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: &IndexCreateStatement) {
    let sql = match db.get_database_backend() {
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => stmt.to_string(SqliteQueryBuilder),
    };

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
