//! Runs the fetch stages in order, checking each sentinel before moving on.

use crate::error::{PipelineError, Stage};
use chrono::Utc;
use domain::{ApiKey, ChannelId, ChannelSnapshot};
use log::{info, warn};
use youtube_api::{
    YouTubeApi, fetch_channel_details, fetch_video_details, fetch_video_stubs,
    resolve_channel_id,
};

/// Name → identifier; NotFound halts before any other fetch
pub async fn resolve(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    channel_name: &str,
) -> Result<ChannelId, PipelineError> {
    match resolve_channel_id(api, key, channel_name)
        .await
        .map_err(PipelineError::fetch(Stage::Resolve))?
    {
        Some(id) => Ok(id),
        None => {
            warn!("No channel matches '{channel_name}'");
            Err(PipelineError::ChannelNotFound {
                name: channel_name.to_string(),
            })
        }
    }
}

/// Channel details, uploads, and statistics. Either every stage succeeds
/// and a complete snapshot comes back, or nothing does.
pub async fn fetch_snapshot(
    api: &dyn YouTubeApi,
    key: &ApiKey,
    channel_id: &ChannelId,
    max_playlist_pages: usize,
) -> Result<ChannelSnapshot, PipelineError> {
    let channel = fetch_channel_details(api, key, channel_id)
        .await
        .map_err(PipelineError::fetch(Stage::ChannelDetails))?
        .ok_or_else(|| PipelineError::ChannelUnavailable {
            channel_id: channel_id.clone(),
        })?;

    let videos = fetch_video_stubs(api, key, &channel.uploads_collection_id, max_playlist_pages)
        .await
        .map_err(PipelineError::fetch(Stage::VideoList))?;
    if videos.is_empty() {
        return Err(PipelineError::NoVideos {
            channel_id: channel_id.clone(),
        });
    }

    let ids: Vec<String> = videos.iter().map(|video| video.id.clone()).collect();
    let details = fetch_video_details(api, key, &ids)
        .await
        .map_err(PipelineError::fetch(Stage::VideoDetails))?;
    if details.is_empty() {
        return Err(PipelineError::NoVideos {
            channel_id: channel_id.clone(),
        });
    }

    info!(
        "Fetched '{}': {} videos, {} with statistics",
        channel.title,
        videos.len(),
        details.len()
    );

    Ok(ChannelSnapshot {
        channel,
        videos,
        details,
        fetched_at: Utc::now(),
    })
}
