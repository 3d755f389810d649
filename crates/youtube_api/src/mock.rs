//! In-memory [`YouTubeApi`] that counts calls and can be told to fail.

use crate::wire::{
    Channel, ChannelContentDetails, ChannelListResponse, ChannelSnippet, ChannelStatistics,
    CommentSnippet, CommentThread, CommentThreadListResponse, CommentThreadSnippet, PageInfo,
    PlaylistItem, PlaylistItemListResponse, PlaylistItemSnippet, RelatedPlaylists, ResourceId,
    SearchListResponse, SearchResult, SearchResultId, Thumbnail, Thumbnails, TopLevelComment,
    Video, VideoContentDetails, VideoSnippet, VideoStatistics, VideosListResponse,
};
use crate::{ApiError, COMMENT_PAGE_SIZE, ChannelLookup, YouTubeApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::ApiKey;
use std::collections::HashMap;
use std::sync::Mutex;

const PAGE_SIZE: usize = 50;

#[derive(Debug, Clone)]
pub struct MockVideo {
    pub id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    /// `(author, text)` pairs, served in order
    pub comments: Vec<(String, String)>,
    pub comments_disabled: bool,
}

impl MockVideo {
    pub fn new(id: &str, title: &str, published_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            published_at,
            view_count: Some(0),
            like_count: Some(0),
            comment_count: Some(0),
            tags: Vec::new(),
            description: None,
            comments: Vec::new(),
            comments_disabled: false,
        }
    }

    pub fn with_stats(
        mut self,
        views: Option<u64>,
        likes: Option<u64>,
        comments: Option<u64>,
    ) -> Self {
        self.view_count = views;
        self.like_count = likes;
        self.comment_count = comments;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_comments(mut self, comments: &[(&str, &str)]) -> Self {
        self.comments = comments
            .iter()
            .map(|(author, text)| (author.to_string(), text.to_string()))
            .collect();
        self
    }

    pub fn with_comments_disabled(mut self) -> Self {
        self.comments_disabled = true;
        self
    }

    fn to_wire(&self) -> Video {
        Video {
            id: self.id.clone(),
            snippet: Some(VideoSnippet {
                published_at: self.published_at,
                title: self.title.clone(),
                description: self
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("About {}", self.title)),
                thumbnails: thumbnails(&self.id),
                tags: self.tags.clone(),
            }),
            statistics: Some(VideoStatistics {
                view_count: self.view_count.map(|v| v.to_string()),
                like_count: self.like_count.map(|v| v.to_string()),
                comment_count: self.comment_count.map(|v| v.to_string()),
            }),
            content_details: Some(VideoContentDetails {
                duration: "PT4M13S".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct MockChannel {
    id: String,
    title: String,
    uploads: String,
    videos: Vec<MockVideo>,
}

/// Number of remote calls per endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub search: usize,
    pub channels: usize,
    pub playlist_items: usize,
    pub videos: usize,
    pub comment_threads: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.search + self.channels + self.playlist_items + self.videos + self.comment_threads
    }
}

#[derive(Debug, Default)]
pub struct MockApi {
    channels: Mutex<Vec<MockChannel>>,
    usernames: HashMap<String, String>,
    endless_pages: bool,
    repeating_page_token: bool,
    fail_videos: bool,
    fail_playlist: bool,
    calls: Mutex<CallCounts>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. Search matches `title` case-insensitively.
    pub fn with_channel(
        self,
        id: &str,
        title: &str,
        uploads: &str,
        videos: Vec<MockVideo>,
    ) -> Self {
        self.lock_channels().push(MockChannel {
            id: id.to_string(),
            title: title.to_string(),
            uploads: uploads.to_string(),
            videos,
        });
        self
    }

    pub fn with_username(mut self, username: &str, channel_id: &str) -> Self {
        self.usernames
            .insert(username.to_string(), channel_id.to_string());
        self
    }

    /// Every playlist page carries a fresh next-page token
    pub fn with_endless_pages(mut self) -> Self {
        self.endless_pages = true;
        self
    }

    /// A followed page token comes back unchanged as the next one
    pub fn with_repeating_page_token(mut self) -> Self {
        self.repeating_page_token = true;
        self
    }

    pub fn failing_videos(mut self) -> Self {
        self.fail_videos = true;
        self
    }

    pub fn failing_playlist(mut self) -> Self {
        self.fail_playlist = true;
        self
    }

    /// Change a video's view count between fetches
    pub fn set_views(&self, video_id: &str, views: u64) {
        for channel in self.lock_channels().iter_mut() {
            for video in channel.videos.iter_mut().filter(|v| v.id == video_id) {
                video.view_count = Some(views);
            }
        }
    }

    pub fn calls(&self) -> CallCounts {
        *self.calls.lock().expect("Failed to acquire lock on calls")
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .expect("Failed to acquire lock on batch_sizes")
            .clone()
    }

    fn lock_channels(&self) -> std::sync::MutexGuard<'_, Vec<MockChannel>> {
        self.channels
            .lock()
            .expect("Failed to acquire lock on channels")
    }

    fn record(&self, f: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.lock().expect("Failed to acquire lock on calls");
        f(&mut *calls);
    }
}

fn thumbnails(id: &str) -> Thumbnails {
    Thumbnails {
        default: None,
        medium: Some(Thumbnail {
            url: format!("https://i.ytimg.com/vi/{id}/mqdefault.jpg"),
        }),
        high: None,
    }
}

fn quota_error() -> ApiError {
    ApiError::QuotaExceeded(
        "The request cannot be completed because you have exceeded your quota.".to_string(),
    )
}

#[async_trait]
impl YouTubeApi for MockApi {
    async fn search_channels(
        &self,
        _key: &ApiKey,
        query: &str,
    ) -> Result<SearchListResponse, ApiError> {
        self.record(|c| c.search += 1);
        let items = self
            .lock_channels()
            .iter()
            .filter(|channel| channel.title.eq_ignore_ascii_case(query))
            .map(|channel| SearchResult {
                id: SearchResultId {
                    kind: Some("youtube#channel".to_string()),
                    channel_id: Some(channel.id.clone()),
                },
            })
            .take(1)
            .collect();
        Ok(SearchListResponse {
            items,
            next_page_token: None,
        })
    }

    async fn channels(
        &self,
        _key: &ApiKey,
        lookup: ChannelLookup<'_>,
    ) -> Result<ChannelListResponse, ApiError> {
        self.record(|c| c.channels += 1);
        let wanted = match lookup {
            ChannelLookup::Id(id) => Some(id.to_string()),
            ChannelLookup::Username(name) => self.usernames.get(name).cloned(),
        };
        let items = self
            .lock_channels()
            .iter()
            .filter(|channel| Some(&channel.id) == wanted.as_ref())
            .map(|channel| Channel {
                id: channel.id.clone(),
                snippet: Some(ChannelSnippet {
                    title: channel.title.clone(),
                    description: format!("{} on YouTube", channel.title),
                    custom_url: None,
                    thumbnails: thumbnails(&channel.id),
                }),
                statistics: Some(ChannelStatistics {
                    view_count: Some("1000".to_string()),
                    subscriber_count: Some("100".to_string()),
                    video_count: Some(channel.videos.len().to_string()),
                }),
                content_details: Some(ChannelContentDetails {
                    related_playlists: RelatedPlaylists {
                        uploads: Some(channel.uploads.clone()),
                    },
                }),
            })
            .collect();
        Ok(ChannelListResponse { items })
    }

    async fn playlist_items(
        &self,
        _key: &ApiKey,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemListResponse, ApiError> {
        self.record(|c| c.playlist_items += 1);
        if self.fail_playlist {
            return Err(quota_error());
        }

        let channels = self.lock_channels();
        let videos = channels
            .iter()
            .find(|channel| channel.uploads == playlist_id)
            .map(|channel| channel.videos.as_slice())
            .unwrap_or_default();

        let offset: usize = page_token
            .and_then(|token| token.strip_prefix("page-"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        let (page, next_page_token) = if self.endless_pages {
            (&videos[..videos.len().min(1)], Some(format!("page-{}", offset + 1)))
        } else if self.repeating_page_token {
            let start = offset.min(videos.len());
            let end = (start + PAGE_SIZE).min(videos.len());
            let next = match page_token {
                Some(token) => token.to_string(),
                None => format!("page-{end}"),
            };
            (&videos[start..end], Some(next))
        } else {
            let start = offset.min(videos.len());
            let end = (start + PAGE_SIZE).min(videos.len());
            let next = (end < videos.len()).then(|| format!("page-{end}"));
            (&videos[start..end], next)
        };

        let items = page
            .iter()
            .map(|video| PlaylistItem {
                snippet: Some(PlaylistItemSnippet {
                    title: video.title.clone(),
                    thumbnails: thumbnails(&video.id),
                    resource_id: Some(ResourceId {
                        video_id: Some(video.id.clone()),
                    }),
                }),
            })
            .collect();

        Ok(PlaylistItemListResponse {
            items,
            next_page_token,
            page_info: PageInfo {
                total_results: videos.len() as i64,
                results_per_page: PAGE_SIZE as i64,
            },
        })
    }

    async fn videos(&self, _key: &ApiKey, ids: &[String]) -> Result<VideosListResponse, ApiError> {
        self.record(|c| c.videos += 1);
        self.batch_sizes
            .lock()
            .expect("Failed to acquire lock on batch_sizes")
            .push(ids.len());
        if self.fail_videos {
            return Err(quota_error());
        }

        let channels = self.lock_channels();
        let items: Vec<Video> = ids
            .iter()
            .filter_map(|id| {
                channels
                    .iter()
                    .flat_map(|channel| channel.videos.iter())
                    .find(|video| &video.id == id)
                    .map(MockVideo::to_wire)
            })
            .collect();

        Ok(VideosListResponse {
            page_info: PageInfo {
                total_results: items.len() as i64,
                results_per_page: items.len() as i64,
            },
            items,
        })
    }

    async fn comment_threads(
        &self,
        _key: &ApiKey,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, ApiError> {
        self.record(|c| c.comment_threads += 1);

        let channels = self.lock_channels();
        let Some(video) = channels
            .iter()
            .flat_map(|channel| channel.videos.iter())
            .find(|video| video.id == video_id)
        else {
            return Err(ApiError::Status {
                status: 404,
                message: format!("Video {video_id} not found"),
            });
        };
        if video.comments_disabled {
            return Err(ApiError::CommentsDisabled);
        }

        let offset: usize = page_token
            .and_then(|token| token.strip_prefix("page-"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let start = offset.min(video.comments.len());
        let end = (start + COMMENT_PAGE_SIZE).min(video.comments.len());

        let items = video.comments[start..end]
            .iter()
            .enumerate()
            .map(|(i, (author, text))| CommentThread {
                id: format!("{video_id}-c{}", start + i),
                snippet: Some(CommentThreadSnippet {
                    top_level_comment: TopLevelComment {
                        snippet: CommentSnippet {
                            author_display_name: author.clone(),
                            author_profile_image_url: String::new(),
                            text_display: text.clone(),
                            like_count: (start + i) as u64,
                            published_at: video.published_at,
                        },
                    },
                }),
            })
            .collect();

        Ok(CommentThreadListResponse {
            items,
            next_page_token: (end < video.comments.len()).then(|| format!("page-{end}")),
        })
    }
}
