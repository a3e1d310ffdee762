//! # sonreb-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Configuration comes from the environment;
//! see [`AppConfig::from_env`].

use sonreb_api::{ApiMetrics, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("configuration rejected: {e}");
        e
    })?;
    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; authentication disabled");
    }
    tracing::info!(?config, "configuration loaded");

    let port = config.port;
    let metrics = ApiMetrics::new()?;
    let app = sonreb_api::app(AppState::with_config(config), metrics);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("SonReb API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
