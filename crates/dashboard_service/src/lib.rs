//! Session-scoped dashboard backend: runs the fetch pipeline with per-session
//! caching and exposes the filtered views over HTTP.

mod error;
mod pipeline;
mod routes;
mod session;

pub use error::{PipelineError, Stage};
pub use pipeline::{fetch_snapshot, resolve};
pub use routes::{
    ChannelOverview, ChannelRequest, CreateSessionResponse, ErrorResponse, SearchRequest,
    SnapshotExport,
};
pub use session::{FilterRejected, Session, SessionRegistry, SharedSession};

use analytics::Forecaster;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use chrono::TimeDelta;
use std::sync::Arc;
use youtube_api::{DEFAULT_MAX_COMMENTS, DEFAULT_MAX_PLAYLIST_PAGES, YouTubeApi};

/// Knobs shared by every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardConfig {
    pub cache_ttl: TimeDelta,
    pub page_size: usize,
    pub max_playlist_pages: usize,
    pub forecast_horizon: usize,
    pub max_comments: usize,
    /// Sessions unused for this long are ended
    pub session_idle_ttl: TimeDelta,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl: TimeDelta::seconds(60),
            page_size: 10,
            max_playlist_pages: DEFAULT_MAX_PLAYLIST_PAGES,
            forecast_horizon: 30,
            max_comments: DEFAULT_MAX_COMMENTS,
            session_idle_ttl: TimeDelta::minutes(30),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn YouTubeApi>,
    pub forecaster: Arc<dyn Forecaster>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn YouTubeApi>,
        forecaster: Arc<dyn Forecaster>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            api,
            forecaster,
            sessions: Arc::new(SessionRegistry::new(config)),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        self.sessions.config()
    }
}

/// Create the router for the dashboard API
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/sessions", post(routes::create_session))
        .route("/sessions/{id}", delete(routes::delete_session))
        .route("/sessions/{id}/channel", put(routes::load_channel))
        .route("/sessions/{id}/refresh", post(routes::refresh))
        .route("/sessions/{id}/snapshot", get(routes::snapshot))
        .route("/sessions/{id}/filters", put(routes::apply_filters))
        .route("/sessions/{id}/dashboard", get(routes::dashboard))
        .route("/sessions/{id}/search", put(routes::search))
        .route("/sessions/{id}/search/next", post(routes::next_page))
        .route("/sessions/{id}/forecast", get(routes::forecast))
        .route("/sessions/{id}/export/videos.csv", get(routes::export_videos))
        .route("/sessions/{id}/videos/{video_id}", get(routes::video))
        .route("/sessions/{id}/videos/{video_id}/comments", get(routes::comments))
        .route(
            "/sessions/{id}/videos/{video_id}/comments.csv",
            get(routes::export_comments),
        )
        .with_state(state)
}
