use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use coach_backend::{config::Config, routes, state::AppState};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coach_backend=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    debug!(?config, "configuration loaded");

    let state = Arc::new(AppState::from_config(&config).context("failed to start coach")?);

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                debug!(removed, "expired chat sessions purged");
            }
        }
    });

    let cors = CorsLayer::very_permissive();

    let app = routes::create_router(state.clone())
        .with_state(state)
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("🚀 AI coach running at http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
