use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::{
    auth, health, import, phone, progress, question, sms, system_config, training,
};
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/sms", sms_routes())
        .nest("/training", training_routes())
        .nest("/admin/questions", question_routes())
        .nest("/import", import_routes())
        .nest("/phone-numbers", phone_routes())
        .nest("/project-progress", progress_routes())
        .nest("/system-config", system_config_routes())
        .routes(routes!(health::health))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(auth::login))
        .routes(routes!(auth::logout))
        .routes(routes!(auth::check))
        .routes(routes!(auth::send_code))
        .routes(routes!(auth::verify_code))
        .routes(routes!(auth::revoke_token))
}

fn sms_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(sms::list_templates, sms::create_template))
        .routes(routes!(
            sms::get_template,
            sms::update_template,
            sms::delete_template
        ))
        .routes(routes!(sms::preview))
        .routes(routes!(sms::send))
        .routes(routes!(sms::list_logs))
}

fn training_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            training::list_categories,
            training::create_category
        ))
        .routes(routes!(
            training::update_category,
            training::delete_category
        ))
        .routes(routes!(training::list_sets, training::create_set))
        .routes(routes!(
            training::get_set,
            training::update_set,
            training::delete_set
        ))
        .routes(routes!(training::exam_questions))
        .routes(routes!(training::set_stats))
        .routes(routes!(training::submit_record, training::list_records))
        .routes(routes!(training::get_record, training::delete_record))
}

fn question_routes() -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            question::list_questions,
            question::create_question
        ))
        .routes(routes!(
            question::get_question,
            question::update_question,
            question::delete_question
        ))
        .routes(routes!(question::parse))
        .routes(routes!(question::import));

    let upload = OpenApiRouter::new()
        .routes(routes!(question::upload))
        .layer(question::question_upload_body_limit());

    crud.merge(upload)
}

fn import_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            import::import_companies,
            import::list_companies
        ))
        .routes(routes!(import::delete_company))
        .routes(routes!(import::list_history))
        .routes(routes!(import::get_history, import::delete_history))
}

fn phone_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(phone::lookup))
        .routes(routes!(phone::lookup_batch))
        .routes(routes!(phone::list_numbers))
        .routes(routes!(phone::update_number, phone::delete_number))
}

fn progress_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(progress::list_projects, progress::create_project))
        .routes(routes!(
            progress::get_project,
            progress::update_project,
            progress::delete_project
        ))
        .routes(routes!(progress::create_phase))
        .routes(routes!(progress::update_phase, progress::delete_phase))
        .routes(routes!(progress::create_module))
        .routes(routes!(progress::update_module, progress::delete_module))
        .routes(routes!(progress::create_item))
        .routes(routes!(progress::update_item, progress::delete_item))
        .routes(routes!(progress::update_item_status))
}

fn system_config_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(system_config::list_configs))
        .routes(routes!(
            system_config::get_config,
            system_config::upsert_config,
            system_config::delete_config
        ))
}
