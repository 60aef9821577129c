pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::header::{CONTENT_TYPE, HeaderName};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::extractors::auth::VERIFY_TOKEN_HEADER;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Internal Business Portal API",
        version = "1.0.0",
        description = "Training exams, SMS, company import, phone lookup and project progress"
    ),
    tags(
        (name = "Auth", description = "Admin login and SMS verification"),
        (name = "SMS", description = "Templates, sending and send logs"),
        (name = "Training", description = "Exam categories, sets and training records"),
        (name = "Questions", description = "Question bank administration and document import"),
        (name = "Import", description = "Company spreadsheet import and history"),
        (name = "Phone Numbers", description = "Carrier lookup and stored numbers"),
        (name = "Project Progress", description = "Projects, phases, modules and items"),
        (name = "System Config", description = "Key-value settings"),
        (name = "Health", description = "Liveness check"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(cors)
}

/// Credentialed CORS for the configured origins. Unparseable origins are skipped.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(VERIFY_TOKEN_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(config.max_age))
}
