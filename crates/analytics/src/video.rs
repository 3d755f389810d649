use crate::filter::like_to_view_ratio;
use chrono::{DateTime, Utc};
use domain::VideoDetail;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("valid regex"));
static OPEN_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[({]").expect("valid regex"));
static SPECIAL_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!?@#$%^&*]").expect("valid regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://").expect("valid regex"));
static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\w+").expect("valid regex"));
static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}").expect("valid regex"));

const POWER_WORDS: &[&str] = &[
    "best", "top", "how to", "guide", "tutorial", "tips", "tricks", "secrets", "ultimate",
    "complete",
];

const CALL_TO_ACTION: &[&str] = &[
    "subscribe",
    "like",
    "comment",
    "share",
    "follow",
    "check out",
    "visit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceRating {
    Excellent,
    VeryGood,
    Good,
    Fair,
    NeedsImprovement,
}

impl PerformanceRating {
    /// Bucket an engagement rate given in percent
    pub fn from_engagement(rate: f64) -> Self {
        match rate {
            r if r >= 5.0 => Self::Excellent,
            r if r >= 3.0 => Self::VeryGood,
            r if r >= 2.0 => Self::Good,
            r if r >= 1.0 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeoRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SeoRating {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => Self::Excellent,
            60..=79 => Self::Good,
            40..=59 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

/// Engagement figures for the single-video page. Percentages are 0..=100
/// scale and zero for videos without views.
///
/// Click-through rate, average view duration and watch time are estimates
/// derived from public counters, not figures reported by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoAnalytics {
    pub video: VideoDetail,
    pub engagement_rate: f64,
    pub like_to_view_percent: f64,
    pub comment_to_view_percent: f64,
    pub days_since_published: i64,
    pub views_per_day: f64,
    pub title_length: usize,
    pub description_length: usize,
    pub tag_count: usize,
    pub title_seo_score: u32,
    pub description_seo_score: u32,
    pub title_seo_rating: SeoRating,
    pub description_seo_rating: SeoRating,
    pub performance_rating: PerformanceRating,
    pub virality_score: f64,
    pub estimated_ctr_percent: f64,
    pub average_view_duration_percent: f64,
    pub estimated_watch_time_hours: u64,
    pub duration_formatted: String,
    /// Percent above (or below) the channel's mean views; 0 when unknown
    pub performance_vs_average: f64,
}

pub fn video_analytics(
    video: &VideoDetail,
    now: DateTime<Utc>,
    channel_average_views: Option<f64>,
) -> VideoAnalytics {
    let views = video.view_count as f64;
    let percent_of_views = |count: u64| {
        if video.view_count == 0 {
            0.0
        } else {
            count as f64 / views * 100.0
        }
    };

    let days_since_published = (now - video.published_date).num_days().max(1);
    let views_per_day = views / days_since_published as f64;
    let engagement_rate = percent_of_views(video.like_count.saturating_add(video.comment_count));
    let like_to_view_percent = like_to_view_ratio(video) * 100.0;

    let title_seo_score = title_seo_score(&video.title);
    let description_seo_score = description_seo_score(&video.description, &video.tags);

    let average_view_duration_percent = (30.0 + engagement_rate * 2.0).min(80.0);
    let watch_seconds =
        views * video.duration_seconds as f64 * average_view_duration_percent / 100.0;

    let performance_vs_average = match channel_average_views {
        Some(average) if average > 0.0 => (views - average) / average * 100.0,
        _ => 0.0,
    };

    VideoAnalytics {
        video: video.clone(),
        engagement_rate,
        like_to_view_percent,
        comment_to_view_percent: percent_of_views(video.comment_count),
        days_since_published,
        views_per_day,
        title_length: video.title.chars().count(),
        description_length: video.description.chars().count(),
        tag_count: video.tags.len(),
        title_seo_score,
        description_seo_score,
        title_seo_rating: SeoRating::from_score(title_seo_score),
        description_seo_rating: SeoRating::from_score(description_seo_score),
        performance_rating: PerformanceRating::from_engagement(engagement_rate),
        virality_score: virality_score(views_per_day, engagement_rate, days_since_published),
        estimated_ctr_percent: estimate_ctr(engagement_rate, like_to_view_percent, title_seo_score),
        average_view_duration_percent,
        estimated_watch_time_hours: (watch_seconds / 3_600.0).round() as u64,
        duration_formatted: format_duration(video.duration_seconds),
        performance_vs_average,
    }
}

/// Heuristic 0..=100 score for a title: length near 50-70 characters,
/// numbers, power words, brackets, few special characters, sentence case.
pub fn title_seo_score(title: &str) -> u32 {
    let mut score = match title.chars().count() {
        50..=70 => 30,
        40..=49 | 71..=100 => 20,
        _ => 10,
    };

    let lower = title.to_lowercase();
    if DIGIT.is_match(title) {
        score += 15;
    }
    if POWER_WORDS.iter().any(|word| lower.contains(word)) {
        score += 15;
    }
    if OPEN_BRACKET.is_match(title) {
        score += 10;
    }
    if SPECIAL_CHAR.find_iter(title).count() <= 2 {
        score += 10;
    }
    if title.starts_with(|c: char| c.is_ascii_uppercase()) {
        score += 10;
    }
    if title != title.to_uppercase() {
        score += 10;
    }

    score.min(100)
}

pub fn description_seo_score(description: &str, tags: &[String]) -> u32 {
    let mut score = match description.chars().count() {
        150..=300 => 25,
        100..=149 => 15,
        301..=500 => 20,
        0..=99 => 0,
        _ => 10,
    };

    if LINK.is_match(description) {
        score += 15;
    }
    if (1..=5).contains(&HASHTAG.find_iter(description).count()) {
        score += 15;
    }
    if TIMESTAMP.is_match(description) {
        score += 10;
    }
    let lower = description.to_lowercase();
    if CALL_TO_ACTION.iter().any(|word| lower.contains(word)) {
        score += 10;
    }
    score += match tags.len() {
        5..=15 => 15,
        3..=4 => 10,
        _ => 0,
    };
    let paragraphs = description
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();
    if paragraphs >= 2 {
        score += 10;
    }

    score.min(100)
}

/// Recent videos with many views per day and high engagement score higher
fn virality_score(views_per_day: f64, engagement_rate: f64, days: i64) -> f64 {
    let recency = (1.0 - days as f64 / 365.0).max(0.0);
    let view_score = ((views_per_day + 1.0).log10() * 10.0).min(50.0);
    let engagement_score = (engagement_rate * 3.0).min(30.0);
    (view_score + engagement_score + recency * 20.0).min(100.0)
}

fn estimate_ctr(engagement_rate: f64, like_percent: f64, title_score: u32) -> f64 {
    let ctr = 3.0
        + engagement_rate / 10.0 * 2.0
        + like_percent / 5.0
        + f64::from(title_score) / 100.0 * 3.0;
    ctr.clamp(1.0, 15.0)
}

pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3_600;
    let minutes = seconds % 3_600 / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
