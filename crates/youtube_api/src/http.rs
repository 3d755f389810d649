use crate::wire::{
    ChannelListResponse, CommentThreadListResponse, ErrorEnvelope, PlaylistItemListResponse,
    SearchListResponse, VideosListResponse,
};
use crate::{ApiError, COMMENT_PAGE_SIZE, ChannelLookup, VIDEO_BATCH_SIZE, YouTubeApi};
use async_trait::async_trait;
use domain::ApiKey;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Error reasons the API uses for quota and rate limiting
const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

/// [`YouTubeApi`] over HTTPS with the credential passed as the `key` query
/// parameter.
#[derive(Debug, Clone)]
pub struct HttpYouTubeApi {
    client: Client,
    base_url: String,
}

impl HttpYouTubeApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("yt-channel-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        key: &ApiKey,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {url} {query:?}");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

/// Map a non-success response body onto [`ApiError`]
fn classify_error(status: u16, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reasons = || envelope.error.errors.iter().map(|item| item.reason.as_str());
            if reasons().any(|reason| reason == "commentsDisabled") {
                return ApiError::CommentsDisabled;
            }
            let quota = envelope
                .error
                .errors
                .iter()
                .any(|item| QUOTA_REASONS.contains(&item.reason.as_str()));
            if quota || status == 429 {
                ApiError::QuotaExceeded(envelope.error.message)
            } else {
                ApiError::Status {
                    status,
                    message: envelope.error.message,
                }
            }
        }
        Err(_) if status == 429 => ApiError::QuotaExceeded(body.to_string()),
        Err(_) => ApiError::Status {
            status,
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl YouTubeApi for HttpYouTubeApi {
    async fn search_channels(
        &self,
        key: &ApiKey,
        query: &str,
    ) -> Result<SearchListResponse, ApiError> {
        self.get_json(
            "search",
            key,
            &[
                ("part", "id"),
                ("type", "channel"),
                ("maxResults", "1"),
                ("q", query),
            ],
        )
        .await
    }

    async fn channels(
        &self,
        key: &ApiKey,
        lookup: ChannelLookup<'_>,
    ) -> Result<ChannelListResponse, ApiError> {
        let (param, value) = match lookup {
            ChannelLookup::Id(id) => ("id", id),
            ChannelLookup::Username(name) => ("forUsername", name),
        };
        self.get_json(
            "channels",
            key,
            &[("part", "snippet,contentDetails,statistics"), (param, value)],
        )
        .await
    }

    async fn playlist_items(
        &self,
        key: &ApiKey,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, ApiError> {
        let mut query = vec![
            ("part", "snippet"),
            ("maxResults", "50"),
            ("playlistId", playlist_id),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json("playlistItems", key, &query).await
    }

    async fn videos(&self, key: &ApiKey, ids: &[String]) -> Result<VideosListResponse, ApiError> {
        debug_assert!(ids.len() <= VIDEO_BATCH_SIZE);
        let joined = ids.join(",");
        self.get_json(
            "videos",
            key,
            &[
                ("part", "snippet,statistics,contentDetails"),
                ("id", joined.as_str()),
            ],
        )
        .await
    }

    async fn comment_threads(
        &self,
        key: &ApiKey,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, ApiError> {
        let max_results = COMMENT_PAGE_SIZE.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results.as_str()),
            ("order", "relevance"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        self.get_json("commentThreads", key, &query).await
    }
}
