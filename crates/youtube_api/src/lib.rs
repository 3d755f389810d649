//! Client side of the YouTube Data API v3: the transport seam, its HTTP
//! implementation and the fetch stages built on top of it.

mod fetch;
mod http;
pub mod wire;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use fetch::{
    COMMENT_PAGE_SIZE, DEFAULT_MAX_COMMENTS, DEFAULT_MAX_PLAYLIST_PAGES, VIDEO_BATCH_SIZE,
    fetch_channel_details, fetch_video_comments, fetch_video_details, fetch_video_stubs,
    resolve_channel_id,
};
pub use http::{DEFAULT_API_BASE, HttpYouTubeApi};

use async_trait::async_trait;
use domain::ApiKey;
use thiserror::Error;
use wire::{
    ChannelListResponse, CommentThreadListResponse, PlaylistItemListResponse, SearchListResponse,
    VideosListResponse,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),
    #[error("Comments are disabled for this video")]
    CommentsDisabled,
    #[error("YouTube API error {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Failed to decode {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

/// How a channel is looked up on the `channels` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLookup<'a> {
    Id(&'a str),
    Username(&'a str),
}

/// One remote call per method, no pagination or batching.
///
/// The fetch stages in this crate drive pagination and batching on top of
/// this trait so that they can be exercised against an in-memory API.
#[async_trait]
pub trait YouTubeApi: Send + Sync {
    /// `search?part=id&type=channel&q=<query>`
    async fn search_channels(
        &self,
        key: &ApiKey,
        query: &str,
    ) -> Result<SearchListResponse, ApiError>;

    /// `channels?part=snippet,contentDetails,statistics`
    async fn channels(
        &self,
        key: &ApiKey,
        lookup: ChannelLookup<'_>,
    ) -> Result<ChannelListResponse, ApiError>;

    /// One page of `playlistItems?part=snippet`
    async fn playlist_items(
        &self,
        key: &ApiKey,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, ApiError>;

    /// `videos?part=snippet,statistics,contentDetails&id=<ids>`; at most
    /// [`VIDEO_BATCH_SIZE`] ids per call
    async fn videos(&self, key: &ApiKey, ids: &[String]) -> Result<VideosListResponse, ApiError>;

    /// One page of `commentThreads?part=snippet&videoId=<id>`, most relevant
    /// first, at most [`COMMENT_PAGE_SIZE`] threads
    async fn comment_threads(
        &self,
        key: &ApiKey,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, ApiError>;
}
