use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque channel identifier returned by name resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public page of the channel on youtube.com
    pub fn channel_url(&self) -> String {
        format!("https://www.youtube.com/channel/{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied API credential, passed to the remote API as `key=`.
///
/// `Debug` is redacted so the key never ends up in logs.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Channel-level aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDetails {
    pub id: ChannelId,
    pub title: String,
    pub description: String,
    pub custom_url: Option<String>,
    pub thumbnail: String,
    pub view_count: u64,
    pub subscriber_count: u64,
    pub video_count: u64,
    pub uploads_collection_id: String,
}

/// Minimal per-video record from the uploads collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStub {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
}

/// Per-video statistics. Missing counters are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetail {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub published_date: DateTime<Utc>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub tags: Vec<String>,
    pub duration_seconds: u64,
}

/// Top-level comment of a video's comment thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub author_profile_image_url: String,
    /// As returned by the API; may contain HTML markup
    pub text: String,
    pub like_count: u64,
    pub published_at: DateTime<Utc>,
}

/// Column-oriented view of the video statistics, one entry per row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoDetailTable {
    pub id: Vec<String>,
    pub title: Vec<String>,
    pub thumbnail: Vec<String>,
    pub published_date: Vec<DateTime<Utc>>,
    pub view_count: Vec<u64>,
    pub like_count: Vec<u64>,
    pub comment_count: Vec<u64>,
    pub tags: Vec<Vec<String>>,
    pub duration_seconds: Vec<u64>,
}

impl VideoDetailTable {
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

impl<'a> FromIterator<&'a VideoDetail> for VideoDetailTable {
    fn from_iter<I: IntoIterator<Item = &'a VideoDetail>>(iter: I) -> Self {
        let mut table = Self::default();
        for video in iter {
            table.id.push(video.id.clone());
            table.title.push(video.title.clone());
            table.thumbnail.push(video.thumbnail.clone());
            table.published_date.push(video.published_date);
            table.view_count.push(video.view_count);
            table.like_count.push(video.like_count);
            table.comment_count.push(video.comment_count);
            table.tags.push(video.tags.clone());
            table.duration_seconds.push(video.duration_seconds);
        }
        table
    }
}

/// Column-oriented view of the uploads collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoStubTable {
    pub id: Vec<String>,
    pub title: Vec<String>,
    pub thumbnail: Vec<String>,
}

impl<'a> FromIterator<&'a VideoStub> for VideoStubTable {
    fn from_iter<I: IntoIterator<Item = &'a VideoStub>>(iter: I) -> Self {
        let mut table = Self::default();
        for stub in iter {
            table.id.push(stub.id.clone());
            table.title.push(stub.title.clone());
            table.thumbnail.push(stub.thumbnail.clone());
        }
        table
    }
}

/// Result of one complete fetch cycle for a channel.
///
/// Only ever built from a pipeline run where every stage succeeded; it is
/// replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub channel: ChannelDetails,
    pub videos: Vec<VideoStub>,
    pub details: Vec<VideoDetail>,
    pub fetched_at: DateTime<Utc>,
}

impl ChannelSnapshot {
    pub fn video_table(&self) -> VideoDetailTable {
        self.details.iter().collect()
    }

    pub fn stub_table(&self) -> VideoStubTable {
        self.videos.iter().collect()
    }

    pub fn summary(&self) -> ChannelSummary {
        ChannelSummary {
            total_views: self.channel.view_count,
            subscribers: self.channel.subscriber_count,
            total_videos: self.videos.len(),
        }
    }

    pub fn find_detail(&self, video_id: &str) -> Option<&VideoDetail> {
        self.details.iter().find(|video| video.id == video_id)
    }

    /// Mean views over the videos with statistics; `None` without any
    pub fn average_views(&self) -> Option<f64> {
        if self.details.is_empty() {
            return None;
        }
        let total: f64 = self.details.iter().map(|video| video.view_count as f64).sum();
        Some(total / self.details.len() as f64)
    }
}

/// Headline metrics shown next to the channel details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub total_views: u64,
    pub subscribers: u64,
    pub total_videos: usize,
}

/// Parse an ISO 8601 video duration such as `PT1H2M10S` into seconds.
///
/// Day components (`P1DT2H`) are honoured; anything unparsable yields 0.
pub fn parse_duration_seconds(iso_duration: &str) -> u64 {
    let Some(rest) = iso_duration.strip_prefix('P') else {
        return 0;
    };

    let mut total = 0u64;
    let mut current = 0u64;
    let mut in_time = false;
    for c in rest.chars() {
        match c {
            '0'..='9' => {
                current = current
                    .saturating_mul(10)
                    .saturating_add(u64::from(c as u8 - b'0'));
            }
            'T' => in_time = true,
            'D' if !in_time => total = total.saturating_add(current.saturating_mul(86_400)),
            'H' if in_time => total = total.saturating_add(current.saturating_mul(3_600)),
            'M' if in_time => total = total.saturating_add(current.saturating_mul(60)),
            'S' if in_time => total = total.saturating_add(current),
            _ => return 0,
        }
        if !c.is_ascii_digit() {
            current = 0;
        }
    }
    total
}
