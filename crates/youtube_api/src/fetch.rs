use crate::wire::{Channel, CommentThread, PlaylistItem, Video};
use crate::{ApiError, ChannelLookup, YouTubeApi};
use domain::{
    ApiKey, ChannelDetails, ChannelId, Comment, VideoDetail, VideoStub, parse_duration_seconds,
};
use log::{debug, info, warn};

/// Maximum ids the `videos` endpoint accepts per call
pub const VIDEO_BATCH_SIZE: usize = 50;

/// Upper bound on followed next-page tokens (50 items per page)
pub const DEFAULT_MAX_PLAYLIST_PAGES: usize = 200;

/// `maxResults` sent to `commentThreads`
pub const COMMENT_PAGE_SIZE: usize = 100;

pub const DEFAULT_MAX_COMMENTS: usize = 100;

/// Resolve a human-readable channel name to its identifier.
///
/// Tries a channel-type search first and falls back to a legacy username
/// lookup. `Ok(None)` means no such channel.
pub async fn resolve_channel_id(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    channel_name: &str,
) -> Result<Option<ChannelId>, ApiError> {
    let name = channel_name.trim().trim_start_matches('@');
    if name.is_empty() {
        return Ok(None);
    }

    let search = api.search_channels(key, name).await?;
    if let Some(id) = search
        .items
        .into_iter()
        .find_map(|item| item.id.channel_id)
    {
        debug!("Resolved channel '{name}' to {id} via search");
        return Ok(Some(ChannelId::new(id)));
    }

    let by_username = api.channels(key, ChannelLookup::Username(name)).await?;
    Ok(by_username
        .items
        .into_iter()
        .next()
        .map(|channel| ChannelId::new(channel.id)))
}

/// Fetch channel-level aggregates. `Ok(None)` when the channel is gone or the
/// response lacks the uploads collection.
pub async fn fetch_channel_details(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    channel_id: &ChannelId,
) -> Result<Option<ChannelDetails>, ApiError> {
    let list = api
        .channels(key, ChannelLookup::Id(channel_id.as_str()))
        .await?;

    let Some(channel) = list.items.into_iter().next() else {
        warn!("Channel {channel_id} not returned by the API");
        return Ok(None);
    };
    Ok(channel_details_from_wire(channel))
}

fn channel_details_from_wire(channel: Channel) -> Option<ChannelDetails> {
    let uploads = channel
        .content_details
        .and_then(|details| details.related_playlists.uploads)?;
    let snippet = channel.snippet?;
    let statistics = channel.statistics.unwrap_or_default();

    Some(ChannelDetails {
        id: ChannelId::new(channel.id),
        title: snippet.title,
        description: snippet.description,
        custom_url: snippet.custom_url,
        thumbnail: snippet.thumbnails.best_url(),
        view_count: parse_count(statistics.view_count.as_deref()),
        subscriber_count: parse_count(statistics.subscriber_count.as_deref()),
        video_count: parse_count(statistics.video_count.as_deref()),
        uploads_collection_id: uploads,
    })
}

/// Enumerate the uploads collection, following next-page tokens until the
/// API stops returning one or `max_pages` pages have been read.
pub async fn fetch_video_stubs(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    uploads_collection_id: &str,
    max_pages: usize,
) -> Result<Vec<VideoStub>, ApiError> {
    let mut stubs = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0;

    loop {
        if pages == max_pages {
            warn!(
                "Stopped enumerating {uploads_collection_id} after {pages} pages; \
                 the API kept returning page tokens"
            );
            break;
        }

        let page = api
            .playlist_items(key, uploads_collection_id, page_token.as_deref())
            .await?;
        pages += 1;

        stubs.extend(page.items.into_iter().filter_map(stub_from_wire));

        match page.next_page_token {
            Some(token) if !token.is_empty() && page_token.as_deref() != Some(token.as_str()) => {
                page_token = Some(token)
            }
            _ => break,
        }
    }

    info!(
        "Enumerated {} videos from {uploads_collection_id} in {pages} page(s)",
        stubs.len()
    );
    Ok(stubs)
}

fn stub_from_wire(item: PlaylistItem) -> Option<VideoStub> {
    let snippet = item.snippet?;
    let id = snippet.resource_id.and_then(|resource| resource.video_id)?;
    Some(VideoStub {
        id,
        title: snippet.title,
        thumbnail: snippet.thumbnails.best_url(),
    })
}

/// Fetch statistics for `video_ids` in batches of [`VIDEO_BATCH_SIZE`].
///
/// Output follows batch order and, within a batch, response order. Ids the
/// API does not return are dropped.
pub async fn fetch_video_details(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    video_ids: &[String],
) -> Result<Vec<VideoDetail>, ApiError> {
    let mut details = Vec::with_capacity(video_ids.len());

    for batch in video_ids.chunks(VIDEO_BATCH_SIZE) {
        let list = api.videos(key, batch).await?;
        let returned = list.items.len();
        details.extend(list.items.into_iter().filter_map(detail_from_wire));
        if returned < batch.len() {
            debug!(
                "Batch of {} ids returned {returned} videos; missing ids dropped",
                batch.len()
            );
        }
    }

    Ok(details)
}

fn detail_from_wire(video: Video) -> Option<VideoDetail> {
    let Some(snippet) = video.snippet else {
        warn!("Video {} has no snippet; dropped", video.id);
        return None;
    };
    let statistics = video.statistics.unwrap_or_default();
    let duration_seconds = video
        .content_details
        .map(|details| parse_duration_seconds(&details.duration))
        .unwrap_or_default();

    Some(VideoDetail {
        id: video.id,
        title: snippet.title,
        description: snippet.description,
        thumbnail: snippet.thumbnails.best_url(),
        published_date: snippet.published_at,
        view_count: parse_count(statistics.view_count.as_deref()),
        like_count: parse_count(statistics.like_count.as_deref()),
        comment_count: parse_count(statistics.comment_count.as_deref()),
        tags: snippet.tags,
        duration_seconds,
    })
}

/// Fetch up to `max_comments` top-level comments of a video, most relevant
/// first. A video with comments disabled yields an empty list.
pub async fn fetch_video_comments(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    video_id: &str,
    max_comments: usize,
) -> Result<Vec<Comment>, ApiError> {
    let max_pages = max_comments.div_ceil(COMMENT_PAGE_SIZE);
    let mut comments = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..max_pages {
        let page = match api
            .comment_threads(key, video_id, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(ApiError::CommentsDisabled) => {
                info!("Comments are disabled for {video_id}");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        comments.extend(page.items.into_iter().filter_map(comment_from_wire));
        if comments.len() >= max_comments {
            break;
        }

        match page.next_page_token {
            Some(token) if !token.is_empty() && page_token.as_deref() != Some(token.as_str()) => {
                page_token = Some(token)
            }
            _ => break,
        }
    }

    comments.truncate(max_comments);
    debug!("Fetched {} comments for {video_id}", comments.len());
    Ok(comments)
}

fn comment_from_wire(thread: CommentThread) -> Option<Comment> {
    let snippet = thread.snippet?.top_level_comment.snippet;
    Some(Comment {
        id: thread.id,
        author: snippet.author_display_name,
        author_profile_image_url: snippet.author_profile_image_url,
        text: snippet.text_display,
        like_count: snippet.like_count,
        published_at: snippet.published_at,
    })
}

/// Counters are decimal strings on the wire; absent or garbled values count
/// as zero.
fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockApi, MockVideo};
    use chrono::{TimeZone, Utc};

    fn key() -> ApiKey {
        ApiKey::new("test-key")
    }

    fn video(id: &str, views: u64) -> MockVideo {
        MockVideo::new(
            id,
            &format!("Video {id}"),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
        .with_stats(Some(views), Some(1), Some(2))
    }

    #[tokio::test]
    async fn unknown_channel_name_resolves_to_none() {
        let api = MockApi::new();

        let resolved = resolve_channel_id(&api, &key(), "nobody").await.unwrap();

        assert!(resolved.is_none());
        assert_eq!(api.calls().search, 1);
        assert_eq!(api.calls().playlist_items, 0);
        assert_eq!(api.calls().videos, 0);
    }

    #[tokio::test]
    async fn channel_name_resolves_through_search_with_handle_prefix() {
        let api = MockApi::new().with_channel("UC1", "PhysicsWallah", "UU1", Vec::new());

        let resolved = resolve_channel_id(&api, &key(), "@PhysicsWallah")
            .await
            .unwrap();

        assert_eq!(resolved, Some(ChannelId::new("UC1")));
    }

    #[tokio::test]
    async fn username_lookup_is_the_fallback() {
        let api = MockApi::new()
            .with_channel("UC1", "Physics Wallah", "UU1", Vec::new())
            .with_username("physicswallah", "UC1");

        let resolved = resolve_channel_id(&api, &key(), "physicswallah")
            .await
            .unwrap();

        assert_eq!(resolved, Some(ChannelId::new("UC1")));
        assert_eq!(api.calls().channels, 1);
    }

    #[tokio::test]
    async fn channel_details_coerce_counters() {
        let api = MockApi::new().with_channel("UC1", "Physics", "UU1", vec![video("a", 5)]);

        let details = fetch_channel_details(&api, &key(), &ChannelId::new("UC1"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(details.title, "Physics");
        assert_eq!(details.uploads_collection_id, "UU1");
        assert_eq!(details.view_count, 1_000);
        assert_eq!(details.subscriber_count, 100);
        assert_eq!(details.video_count, 1);
    }

    #[tokio::test]
    async fn missing_channel_is_absent() {
        let api = MockApi::new();

        let details = fetch_channel_details(&api, &key(), &ChannelId::new("UCgone"))
            .await
            .unwrap();

        assert!(details.is_none());
    }

    #[tokio::test]
    async fn video_stubs_follow_page_tokens_in_order() {
        let videos: Vec<_> = (0..120).map(|i| video(&format!("v{i}"), i)).collect();
        let api = MockApi::new().with_channel("UC1", "Physics", "UU1", videos);

        let stubs = fetch_video_stubs(&api, &key(), "UU1", DEFAULT_MAX_PLAYLIST_PAGES)
            .await
            .unwrap();

        assert_eq!(stubs.len(), 120);
        assert_eq!(stubs[0].id, "v0");
        assert_eq!(stubs[119].id, "v119");
        assert_eq!(api.calls().playlist_items, 3);
    }

    #[tokio::test]
    async fn empty_uploads_collection_is_not_an_error() {
        let api = MockApi::new().with_channel("UC1", "Empty", "UU1", Vec::new());

        let stubs = fetch_video_stubs(&api, &key(), "UU1", DEFAULT_MAX_PLAYLIST_PAGES)
            .await
            .unwrap();

        assert!(stubs.is_empty());
        assert_eq!(api.calls().playlist_items, 1);
    }

    #[tokio::test]
    async fn endless_page_tokens_are_capped() {
        let api = MockApi::new()
            .with_channel("UC1", "Loop", "UU1", vec![video("a", 1)])
            .with_endless_pages();

        let stubs = fetch_video_stubs(&api, &key(), "UU1", 5).await.unwrap();

        assert_eq!(api.calls().playlist_items, 5);
        assert_eq!(stubs.len(), 5);
    }

    #[tokio::test]
    async fn repeated_page_token_stops_enumeration() {
        let videos: Vec<_> = (0..60).map(|i| video(&format!("v{i}"), i)).collect();
        let api = MockApi::new()
            .with_channel("UC1", "Repeat", "UU1", videos)
            .with_repeating_page_token();

        let stubs = fetch_video_stubs(&api, &key(), "UU1", DEFAULT_MAX_PLAYLIST_PAGES)
            .await
            .unwrap();

        assert_eq!(api.calls().playlist_items, 2);
        assert_eq!(stubs.len(), 60);
        let mut ids: Vec<_> = stubs.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 60);
    }

    #[tokio::test]
    async fn details_are_fetched_in_ceil_batches_preserving_order() {
        let videos: Vec<_> = (0..101).map(|i| video(&format!("v{i}"), i)).collect();
        let ids: Vec<String> = videos.iter().map(|v| v.id.clone()).collect();
        let api = MockApi::new().with_channel("UC1", "Physics", "UU1", videos);

        let details = fetch_video_details(&api, &key(), &ids).await.unwrap();

        assert_eq!(api.calls().videos, 3);
        assert_eq!(api.batch_sizes(), vec![50, 50, 1]);
        let returned: Vec<_> = details.iter().map(|d| d.id.clone()).collect();
        assert_eq!(returned, ids);
    }

    #[tokio::test]
    async fn unknown_ids_are_dropped_and_missing_stats_are_zero() {
        let api = MockApi::new().with_channel(
            "UC1",
            "Physics",
            "UU1",
            vec![
                video("a", 10),
                MockVideo::new("quiet", "Comments off", Utc::now()).with_stats(Some(7), None, None),
            ],
        );
        let ids = vec!["a".to_string(), "private".to_string(), "quiet".to_string()];

        let details = fetch_video_details(&api, &key(), &ids).await.unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details[1].id, "quiet");
        assert_eq!(details[1].view_count, 7);
        assert_eq!(details[1].like_count, 0);
        assert_eq!(details[1].comment_count, 0);
    }

    #[tokio::test]
    async fn no_ids_means_no_calls() {
        let api = MockApi::new();

        let details = fetch_video_details(&api, &key(), &[]).await.unwrap();

        assert!(details.is_empty());
        assert_eq!(api.calls().videos, 0);
    }

    #[tokio::test]
    async fn quota_errors_surface_as_api_errors() {
        let api = MockApi::new()
            .with_channel("UC1", "Physics", "UU1", vec![video("a", 1)])
            .failing_videos();

        let result = fetch_video_details(&api, &key(), &["a".to_string()]).await;

        assert!(matches!(result, Err(ApiError::QuotaExceeded(_))));
    }

    fn commented_video(count: usize) -> MockVideo {
        let comments: Vec<(String, String)> = (0..count)
            .map(|i| (format!("viewer{i}"), format!("comment {i}")))
            .collect();
        let borrowed: Vec<(&str, &str)> = comments
            .iter()
            .map(|(a, t)| (a.as_str(), t.as_str()))
            .collect();
        video("a", 1).with_comments(&borrowed)
    }

    #[tokio::test]
    async fn comments_follow_pages_up_to_the_cap() {
        let api = MockApi::new().with_channel("UC1", "Talk", "UU1", vec![commented_video(250)]);

        let comments = fetch_video_comments(&api, &key(), "a", 150).await.unwrap();

        assert_eq!(comments.len(), 150);
        assert_eq!(comments[0].author, "viewer0");
        assert_eq!(comments[149].text, "comment 149");
        assert_eq!(api.calls().comment_threads, 2);
    }

    #[tokio::test]
    async fn comments_stop_when_pages_run_out() {
        let api = MockApi::new().with_channel("UC1", "Talk", "UU1", vec![commented_video(30)]);

        let comments = fetch_video_comments(&api, &key(), "a", DEFAULT_MAX_COMMENTS)
            .await
            .unwrap();

        assert_eq!(comments.len(), 30);
        assert_eq!(api.calls().comment_threads, 1);
    }

    #[tokio::test]
    async fn disabled_comments_are_empty() {
        let api = MockApi::new().with_channel(
            "UC1",
            "Quiet",
            "UU1",
            vec![video("a", 1).with_comments_disabled()],
        );

        let comments = fetch_video_comments(&api, &key(), "a", DEFAULT_MAX_COMMENTS)
            .await
            .unwrap();

        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn zero_comment_cap_makes_no_calls() {
        let api = MockApi::new().with_channel("UC1", "Talk", "UU1", vec![commented_video(5)]);

        let comments = fetch_video_comments(&api, &key(), "a", 0).await.unwrap();

        assert!(comments.is_empty());
        assert_eq!(api.calls().comment_threads, 0);
    }

    #[test]
    fn garbled_counts_are_zero() {
        assert_eq!(parse_count(Some("42")), 42);
        assert_eq!(parse_count(Some("n/a")), 0);
        assert_eq!(parse_count(None), 0);
    }
}
