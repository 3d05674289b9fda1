use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mex_server::config::ServerConfig;
use mex_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env().context("failed to read configuration")?;
    info!(public_url = %config.public_url, "configuration loaded");

    // Logs in to every provider; any failure aborts startup.
    let app_state = AppState::from_config(&config).await?;

    let app = mex_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(addr = %config.bind, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
