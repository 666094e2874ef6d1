use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dashboard_api::{config, database::DatabaseManager, jobs, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SEALING_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config().clone();
    tracing::info!("Starting dashboard API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }
    // Read again on every seal/open; a missing key fails there
    if config::sealing_key_raw().is_none() {
        tracing::warn!("{} is not set; credential sealing will fail", config::SEALING_KEY_VAR);
    }

    let store = DatabaseManager::open(&config.store)
        .await
        .context("failed to open document store")?;
    let port = config.server.port;
    let state = AppState::from_config(config, store)?;

    let _jobs = jobs::spawn_all(&state);
    let app = routes::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Dashboard API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
