use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    /// Whether the database answered a ping.
    pub database: bool,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Liveness and database reachability",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
)]
#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database ping failed");
            false
        }
    };
    Json(HealthResponse {
        status: "ok",
        database,
    })
}
