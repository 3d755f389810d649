use crate::AppState;
use crate::error::PipelineError;
use crate::session::{FilterRejected, Session, SharedSession};
use analytics::{
    CommentSummary, DashboardView, ExportError, FilterState, FilterUpdate, ForecastError,
    ForecastView, SearchPage, VideoAnalytics, comments_csv, forecast_view, summarize_comments,
    video_analytics, videos_csv,
};
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use domain::{
    ApiKey, ChannelDetails, ChannelSnapshot, ChannelSummary, VideoDetailTable, VideoStub,
    VideoStubTable,
};
use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Request body for loading a channel into a session
#[derive(Debug, Deserialize)]
pub struct ChannelRequest {
    pub api_key: ApiKey,
    pub channel_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

/// Header section of the dashboard
#[derive(Debug, Serialize)]
pub struct ChannelOverview {
    pub channel: ChannelDetails,
    pub channel_url: String,
    pub summary: ChannelSummary,
    pub fetched_at: DateTime<Utc>,
    pub filters: Option<FilterState>,
    pub search: Option<SearchPage>,
}

/// The four artifacts of a fetch, as loaded
#[derive(Debug, Serialize)]
pub struct SnapshotExport {
    pub channel: ChannelDetails,
    pub videos: Vec<VideoStub>,
    pub video_table: VideoDetailTable,
    pub stub_table: VideoStubTable,
    pub fetched_at: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Last valid view, when the request was a rejected filter change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<DashboardView>,
}

/// `Json` whose rejections answer with [`ErrorResponse`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(HandlerError))]
pub(crate) struct JsonBody<T>(pub T);

/// `Path` whose rejections answer with [`ErrorResponse`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(HandlerError))]
pub(crate) struct PathParams<T>(pub T);

#[derive(Error, Debug)]
pub(crate) enum HandlerError {
    /// The request itself could not be read: bad path segment or body
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        message: String,
        current: Option<DashboardView>,
    },
    #[error("Session '{0}' not found")]
    SessionNotFound(Uuid),
    #[error("No channel loaded yet")]
    NoChannel,
    #[error("Video '{0}' not found")]
    VideoNotFound(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("{}", .0.error)]
    Filters(FilterRejected),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<JsonRejection> for HandlerError {
    fn from(rejection: JsonRejection) -> Self {
        HandlerError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
            current: None,
        }
    }
}

impl From<PathRejection> for HandlerError {
    fn from(rejection: PathRejection) -> Self {
        HandlerError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
            current: None,
        }
    }
}

impl HandlerError {
    fn status(&self) -> StatusCode {
        match self {
            HandlerError::Rejected { status, .. } => *status,
            HandlerError::SessionNotFound(_) | HandlerError::VideoNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            HandlerError::NoChannel => StatusCode::CONFLICT,
            HandlerError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HandlerError::Filters(_) | HandlerError::Forecast(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            HandlerError::Pipeline(err) => match err {
                PipelineError::MissingInput => StatusCode::UNPROCESSABLE_ENTITY,
                PipelineError::ChannelNotFound { .. }
                | PipelineError::ChannelUnavailable { .. }
                | PipelineError::NoVideos { .. } => StatusCode::NOT_FOUND,
                PipelineError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {self}");
        }
        let error = self.to_string();
        let current = match self {
            HandlerError::Filters(rejected) => rejected.current,
            HandlerError::Rejected { current, .. } => current,
            _ => None,
        };
        let body = ErrorResponse {
            success: false,
            error,
            current,
        };
        (status, Json(body)).into_response()
    }
}

type HandlerResult<T> = Result<Json<T>, HandlerError>;

fn session(state: &AppState, id: Uuid) -> Result<SharedSession, HandlerError> {
    state
        .sessions
        .get(&id)
        .ok_or(HandlerError::SessionNotFound(id))
}

fn overview(session: &Session, snapshot: &ChannelSnapshot) -> ChannelOverview {
    ChannelOverview {
        channel: snapshot.channel.clone(),
        channel_url: snapshot.channel.id.channel_url(),
        summary: snapshot.summary(),
        fetched_at: snapshot.fetched_at,
        filters: session.filters().cloned(),
        search: session.current_page(),
    }
}

pub(crate) async fn health() -> &'static str {
    "OK"
}

pub(crate) async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(CreateSessionResponse { session_id }))
}

pub(crate) async fn delete_session(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> Result<StatusCode, HandlerError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(HandlerError::SessionNotFound(id))
    }
}

pub(crate) async fn load_channel(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(request): JsonBody<ChannelRequest>,
) -> HandlerResult<ChannelOverview> {
    let shared = session(&state, id)?;
    let mut session = shared.lock().await;
    let snapshot = session
        .load_channel(state.api.as_ref(), request.api_key, &request.channel_name)
        .await?;
    Ok(Json(overview(&session, &snapshot)))
}

pub(crate) async fn refresh(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> HandlerResult<ChannelOverview> {
    let shared = session(&state, id)?;
    let mut session = shared.lock().await;
    let snapshot = session
        .refresh(state.api.as_ref())
        .await
        .ok_or(HandlerError::NoChannel)??;
    Ok(Json(overview(&session, &snapshot)))
}

pub(crate) async fn snapshot(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> HandlerResult<SnapshotExport> {
    let shared = session(&state, id)?;
    let session = shared.lock().await;
    let snapshot = session.snapshot().ok_or(HandlerError::NoChannel)?;
    Ok(Json(SnapshotExport {
        channel: snapshot.channel.clone(),
        videos: snapshot.videos.clone(),
        video_table: snapshot.video_table(),
        stub_table: snapshot.stub_table(),
        fetched_at: snapshot.fetched_at,
    }))
}

pub(crate) async fn apply_filters(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    update: Result<JsonBody<FilterUpdate>, HandlerError>,
) -> HandlerResult<DashboardView> {
    let shared = session(&state, id)?;
    let mut session = shared.lock().await;
    let update = match update {
        Ok(JsonBody(update)) => update,
        Err(HandlerError::Rejected { status, message, .. }) => {
            return Err(HandlerError::Rejected {
                status,
                message,
                current: session.dashboard(),
            });
        }
        Err(err) => return Err(err),
    };
    match session.apply_filters(update) {
        Some(Ok(view)) => Ok(Json(view)),
        Some(Err(rejected)) => Err(HandlerError::Filters(rejected)),
        None => Err(HandlerError::NoChannel),
    }
}

pub(crate) async fn dashboard(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> HandlerResult<DashboardView> {
    let shared = session(&state, id)?;
    let session = shared.lock().await;
    session.dashboard().map(Json).ok_or(HandlerError::NoChannel)
}

pub(crate) async fn search(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
    JsonBody(request): JsonBody<SearchRequest>,
) -> HandlerResult<SearchPage> {
    let shared = session(&state, id)?;
    let mut session = shared.lock().await;
    session
        .search(&request.query)
        .map(Json)
        .ok_or(HandlerError::NoChannel)
}

/// Past the last page the current page comes back unchanged
pub(crate) async fn next_page(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> HandlerResult<SearchPage> {
    let shared = session(&state, id)?;
    let mut session = shared.lock().await;
    match session.next_page().ok_or(HandlerError::NoChannel)? {
        Some(page) => Ok(Json(page)),
        None => session
            .current_page()
            .map(Json)
            .ok_or(HandlerError::NoChannel),
    }
}

pub(crate) async fn forecast(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> HandlerResult<ForecastView> {
    let shared = session(&state, id)?;
    let session = shared.lock().await;
    let snapshot = session.snapshot().ok_or(HandlerError::NoChannel)?;
    let view = forecast_view(
        &snapshot.details,
        state.forecaster.as_ref(),
        state.config().forecast_horizon,
    )?;
    Ok(Json(view))
}

pub(crate) async fn video(
    State(state): State<AppState>,
    PathParams((id, video_id)): PathParams<(Uuid, String)>,
) -> HandlerResult<VideoAnalytics> {
    let shared = session(&state, id)?;
    let session = shared.lock().await;
    let snapshot = session.snapshot().ok_or(HandlerError::NoChannel)?;
    let detail = snapshot
        .find_detail(&video_id)
        .ok_or(HandlerError::VideoNotFound(video_id))?;
    Ok(Json(video_analytics(detail, Utc::now(), snapshot.average_views())))
}

async fn load_comments(
    state: &AppState,
    id: Uuid,
    video_id: String,
) -> Result<CommentSummary, HandlerError> {
    let shared = session(state, id)?;
    let session = shared.lock().await;
    let snapshot = session.snapshot().ok_or(HandlerError::NoChannel)?;
    if snapshot.find_detail(&video_id).is_none() {
        return Err(HandlerError::VideoNotFound(video_id));
    }
    let comments = session
        .video_comments(state.api.as_ref(), &video_id)
        .await
        .ok_or(HandlerError::NoChannel)??;
    Ok(summarize_comments(&comments))
}

pub(crate) async fn comments(
    State(state): State<AppState>,
    PathParams((id, video_id)): PathParams<(Uuid, String)>,
) -> HandlerResult<CommentSummary> {
    Ok(Json(load_comments(&state, id, video_id).await?))
}

fn csv_attachment(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Filtered table rows, as shown on the dashboard
pub(crate) async fn export_videos(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> Result<Response, HandlerError> {
    let shared = session(&state, id)?;
    let session = shared.lock().await;
    let view = session.dashboard().ok_or(HandlerError::NoChannel)?;
    Ok(csv_attachment("videos.csv", videos_csv(&view.rows)?))
}

pub(crate) async fn export_comments(
    State(state): State<AppState>,
    PathParams((id, video_id)): PathParams<(Uuid, String)>,
) -> Result<Response, HandlerError> {
    let filename = format!("{video_id}-comments.csv");
    let summary = load_comments(&state, id, video_id).await?;
    Ok(csv_attachment(&filename, comments_csv(&summary.comments)?))
}
