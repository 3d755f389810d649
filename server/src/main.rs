mod config;

use analytics::LinearTrendForecaster;
use config::Config;
use dashboard_service::{AppState, create_router};
use log::info;
use std::sync::Arc;
use youtube_api::HttpYouTubeApi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let api = HttpYouTubeApi::new(&config.api_base, config.request_timeout)?;
    let state = AppState::new(
        Arc::new(api),
        Arc::new(LinearTrendForecaster),
        config.dashboard,
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Dashboard API listening on {}", listener.local_addr()?);
    info!("Remote API at {}", config.api_base);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
