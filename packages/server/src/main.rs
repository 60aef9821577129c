use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use portal_server::config::AppConfig;
use portal_server::database::init_db;
use portal_server::seed::{ensure_indexes, seed_defaults};
use portal_server::services::verification::spawn_sweeper;
use portal_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load()?;
    if config.auth.admin_password.is_empty() {
        anyhow::bail!("auth.admin_password must be set");
    }

    let db = init_db(&config.database.url, config.database.max_connections).await?;
    seed_defaults(&db).await?;
    ensure_indexes(&db).await?;

    let address = format!("{}:{}", config.server.host, config.server.port);
    let sweep_every = Duration::from_secs(config.verification.sweep_interval_secs.max(1));

    let state = AppState::new(db, config)?;
    let _sweeper = spawn_sweeper(&state.verification, sweep_every);

    let app = portal_server::build_router(state);

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);
    info!("API docs at http://{}/swagger-ui", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
