use analytics::LinearTrendForecaster;
use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use dashboard_service::{AppState, CreateSessionResponse, DashboardConfig, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use youtube_api::mock::{MockApi, MockVideo};

fn mock_api() -> Arc<MockApi> {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let videos = vec![
        MockVideo::new("v1", "Rust in 100 Seconds", base)
            .with_stats(Some(1_000), Some(100), Some(10))
            .with_tags(&["rust", "Systems Programming"])
            .with_comments(&[
                ("Ferris", "Great video, thanks!"),
                ("Ferris", "Awesome <b>intro</b>"),
                ("Crab", "Worst, explanation"),
            ]),
        MockVideo::new("v2", "Async Rust Explained", base + Duration::days(10))
            .with_stats(Some(0), Some(0), Some(0))
            .with_comments_disabled(),
        MockVideo::new("v3", "Borrow Checker Deep Dive", base + Duration::days(20))
            .with_stats(Some(4_000), Some(200), Some(40))
            .with_tags(&["rust"]),
    ];
    Arc::new(MockApi::new().with_channel("UCrust", "Rustaceans", "UUrust", videos))
}

fn app(api: Arc<MockApi>) -> Router {
    let state = AppState::new(
        api,
        Arc::new(LinearTrendForecaster),
        DashboardConfig {
            page_size: 2,
            ..DashboardConfig::default()
        },
    );
    create_router(state)
}

async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, HeaderMap, Bytes) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, method, uri, body.map(|b| b.to_string())).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send(app, Method::POST, "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let created: CreateSessionResponse = serde_json::from_value(body).unwrap();
    created.session_id.to_string()
}

async fn load(app: &Router, id: &str, name: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::PUT,
        &format!("/sessions/{id}/channel"),
        Some(json!({ "api_key": "test-key", "channel_name": name })),
    )
    .await
}

#[tokio::test]
async fn health_is_ok() {
    let app = app(mock_api());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn load_channel_returns_overview() {
    let app = app(mock_api());
    let id = new_session(&app).await;

    let (status, body) = load(&app, &id, "@rustaceans").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel"]["title"], "Rustaceans");
    assert_eq!(body["channel_url"], "https://www.youtube.com/channel/UCrust");
    assert_eq!(body["summary"]["total_videos"], 3);
    assert_eq!(body["filters"]["num_videos"], 10);
    assert_eq!(body["search"]["total_matches"], 3);
}

#[tokio::test]
async fn unknown_channel_is_not_found_and_fetches_nothing() {
    let api = mock_api();
    let app = app(api.clone());
    let id = new_session(&app).await;

    let (status, body) = load(&app, &id, "Nobody Here").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Invalid Channel Name. Please check and enter a valid Channel Name."
    );
    assert_eq!(api.calls().playlist_items, 0);
    assert_eq!(api.calls().videos, 0);

    let (status, _) = send(&app, Method::GET, &format!("/sessions/{id}/dashboard"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let app = app(mock_api());
    let id = new_session(&app).await;

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/sessions/{id}/channel"),
        Some(json!({ "api_key": "  ", "channel_name": "Rustaceans" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let api = Arc::new(
        MockApi::new()
            .with_channel("UC1", "Broken", "UU1", vec![MockVideo::new("a", "A", base)])
            .failing_playlist(),
    );
    let app = app(api);
    let id = new_session(&app).await;

    let (status, body) = load(&app, &id, "Broken").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("video list"));
}

#[tokio::test]
async fn sessions_do_not_share_caches() {
    let api = mock_api();
    let app = app(api.clone());
    let first = new_session(&app).await;
    let second = new_session(&app).await;

    load(&app, &first, "Rustaceans").await;
    let after_first = api.calls();
    load(&app, &first, "Rustaceans").await;
    assert_eq!(api.calls(), after_first);

    load(&app, &second, "Rustaceans").await;
    assert_eq!(api.calls().videos, after_first.videos * 2);
}

#[tokio::test]
async fn refresh_requires_a_channel_and_refetches() {
    let api = mock_api();
    let app = app(api.clone());
    let id = new_session(&app).await;

    let (status, _) = send(&app, Method::POST, &format!("/sessions/{id}/refresh"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    load(&app, &id, "Rustaceans").await;
    api.set_views("v1", 5_000);
    let before = api.calls();
    let (status, _) = send(&app, Method::POST, &format!("/sessions/{id}/refresh"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(api.calls().videos, before.videos + 1);

    let (_, snapshot) = send(&app, Method::GET, &format!("/sessions/{id}/snapshot"), None).await;
    assert_eq!(snapshot["video_table"]["view_count"][0], 5_000);
    assert_eq!(snapshot["stub_table"]["id"], json!(["v1", "v2", "v3"]));
    assert_eq!(snapshot["videos"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn invalid_filters_return_previous_view() {
    let app = app(mock_api());
    let id = new_session(&app).await;
    load(&app, &id, "Rustaceans").await;
    let uri = format!("/sessions/{id}/filters");

    let (status, view) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "num_videos": 1, "tag": "rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["rows"].as_array().unwrap().len(), 2);
    assert_eq!(view["top_by_views"][0]["id"], "v3");
    assert_eq!(view["top_by_views"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "start_date": "2024-04-01", "end_date": "2024-03-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["error"],
        "Start date should be earlier than end date (2024-04-01 > 2024-03-01)."
    );
    assert_eq!(body["current"]["filters"]["tag_query"], "rust");

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "num_videos": 51 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["current"]["filters"]["num_videos"], 1);
}

#[tokio::test]
async fn zero_view_video_has_zero_ratio() {
    let app = app(mock_api());
    let id = new_session(&app).await;
    load(&app, &id, "Rustaceans").await;

    let (_, view) = send(&app, Method::GET, &format!("/sessions/{id}/dashboard"), None).await;
    let v2 = view["rows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["id"] == "v2")
        .unwrap();
    assert_eq!(v2["like_to_view_ratio"], 0.0);
}

#[tokio::test]
async fn search_pages_and_resets() {
    let app = app(mock_api());
    let id = new_session(&app).await;
    load(&app, &id, "Rustaceans").await;
    let search_uri = format!("/sessions/{id}/search");
    let next_uri = format!("/sessions/{id}/search/next");

    let (_, page) = send(&app, Method::PUT, &search_uri, Some(json!({ "query": "RUST" }))).await;
    assert_eq!(page["total_matches"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["has_more"], false);

    let (_, page) = send(&app, Method::PUT, &search_uri, Some(json!({ "query": "" }))).await;
    assert_eq!(page["total_matches"], 3);
    assert_eq!(page["has_more"], true);

    let (_, page) = send(&app, Method::POST, &next_uri, None).await;
    assert_eq!(page["window"]["start"], 2);
    assert_eq!(page["items"][0]["id"], "v3");

    // Already on the last page
    let (status, page) = send(&app, Method::POST, &next_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["window"]["start"], 2);

    let (_, page) = send(&app, Method::PUT, &search_uri, Some(json!({ "query": "borrow" }))).await;
    assert_eq!(page["window"]["start"], 0);
    assert_eq!(page["total_matches"], 1);
}

#[tokio::test]
async fn forecast_and_video_analytics() {
    let app = app(mock_api());
    let id = new_session(&app).await;
    load(&app, &id, "Rustaceans").await;

    let (status, forecast) =
        send(&app, Method::GET, &format!("/sessions/{id}/forecast"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forecast["predicted"].as_array().unwrap().len(), 30);
    assert_eq!(forecast["fitted"].as_array().unwrap().len(), 3);

    let (status, video) =
        send(&app, Method::GET, &format!("/sessions/{id}/videos/v1"), None).await;
    assert_eq!(status, StatusCode::OK);
    let engagement = video["engagement_rate"].as_f64().unwrap();
    assert!((engagement - 11.0).abs() < 1e-9);
    assert_eq!(video["video"]["duration_seconds"], 253);
    assert_eq!(video["duration_formatted"], "4m 13s");
    // channel mean is 5000 / 3 views
    let vs_average = video["performance_vs_average"].as_f64().unwrap();
    assert!((vs_average + 40.0).abs() < 1e-9);
    assert_eq!(video["performance_rating"], "excellent");
    assert!(video["title_seo_score"].as_u64().unwrap() > 0);

    let (status, _) = send(&app, Method::GET, &format!("/sessions/{id}/videos/nope"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_session_is_gone() {
    let app = app(mock_api());
    let id = new_session(&app).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/sessions/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = load(&app, &id, "Rustaceans").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("Session '{id}' not found"));
}

#[tokio::test]
async fn malformed_requests_answer_with_json_errors() {
    let app = app(mock_api());
    let id = new_session(&app).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/sessions/{id}/channel"),
        Some(json!({ "channel_name": "Rustaceans" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("api_key"));

    let (status, body) = send(&app, Method::GET, "/sessions/not-a-uuid/dashboard", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, _, bytes) = send_raw(
        &app,
        Method::PUT,
        &format!("/sessions/{id}/search"),
        Some("{\"query\": ".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unreadable_filter_body_keeps_the_current_view() {
    let app = app(mock_api());
    let id = new_session(&app).await;
    load(&app, &id, "Rustaceans").await;
    let uri = format!("/sessions/{id}/filters");
    send(&app, Method::PUT, &uri, Some(json!({ "num_videos": 2 }))).await;

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "num_videos": -1 }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("num_videos"));
    assert_eq!(body["current"]["filters"]["num_videos"], 2);
}

#[tokio::test]
async fn comments_are_scored_and_ranked() {
    let api = mock_api();
    let app = app(api.clone());
    let id = new_session(&app).await;

    let uri = format!("/sessions/{id}/videos/v1/comments");
    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    load(&app, &id, "Rustaceans").await;
    let (status, summary) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["comments"].as_array().unwrap().len(), 3);
    assert_eq!(summary["sentiment_counts"]["positive"], 2);
    assert_eq!(summary["sentiment_counts"]["negative"], 1);
    assert_eq!(summary["top_commenters"][0]["author"], "Ferris");
    assert_eq!(summary["top_commenters"][0]["count"], 2);
    assert_eq!(summary["comments"][2]["sentiment"], "Negative");

    send(&app, Method::GET, &uri, None).await;
    assert_eq!(api.calls().comment_threads, 1);

    let (status, disabled) =
        send(&app, Method::GET, &format!("/sessions/{id}/videos/v2/comments"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(disabled["sentiment_score"], 0.0);
    assert!(disabled["comments"].as_array().unwrap().is_empty());

    let (status, _) =
        send(&app, Method::GET, &format!("/sessions/{id}/videos/nope/comments"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csv_exports() {
    let app = app(mock_api());
    let id = new_session(&app).await;
    load(&app, &id, "Rustaceans").await;
    send(
        &app,
        Method::PUT,
        &format!("/sessions/{id}/filters"),
        Some(json!({ "tag": "rust" })),
    )
    .await;

    let (status, headers, bytes) = send_raw(
        &app,
        Method::GET,
        &format!("/sessions/{id}/export/videos.csv"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Video ID,Title"));
    assert!(lines[1].starts_with("v1,Rust in 100 Seconds,"));
    assert!(lines[1].ends_with(",rust; Systems Programming"));

    let (status, headers, bytes) = send_raw(
        &app,
        Method::GET,
        &format!("/sessions/{id}/videos/v1/comments.csv"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"v1-comments.csv\""
    );
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines[0], "Author,Comment,Likes,Published Date,Sentiment,Comment ID");
    assert!(lines[1].starts_with("Ferris,\"Great video, thanks!\",0,"));
    assert!(lines[2].starts_with("Ferris,Awesome intro,1,"));
    assert!(lines[3].ends_with(",Negative,v1-c2"));
}
