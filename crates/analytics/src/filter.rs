use crate::ValidationError;
use crate::forecast::SeriesPoint;
use crate::tags::{TagCount, tag_frequencies};
use chrono::{DateTime, NaiveDate, Utc};
use domain::VideoDetail;
use serde::{Deserialize, Serialize};

/// Upper bound of the "top N videos" selector
pub const MAX_TOP_VIDEOS: u32 = 50;

const DEFAULT_TOP_VIDEOS: u32 = 10;

/// Inclusive calendar-day range, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// Smallest range covering every publish date, `None` for no videos
    pub fn spanning(details: &[VideoDetail]) -> Option<Self> {
        let dates = details.iter().map(|v| v.published_date.date_naive());
        let start = dates.clone().min()?;
        let end = dates.max()?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whole days on both ends are included
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        self.start <= day && day <= self.end
    }
}

/// Selections that shape the statistics views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    pub num_videos: u32,
    pub date_range: DateRange,
    pub tag_query: String,
}

/// Partial update sent by a filter widget; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterUpdate {
    pub num_videos: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tag: Option<String>,
}

impl FilterState {
    /// Top 10, the full publish-date span, no tag
    pub fn initial(details: &[VideoDetail]) -> Option<Self> {
        Some(Self {
            num_videos: DEFAULT_TOP_VIDEOS,
            date_range: DateRange::spanning(details)?,
            tag_query: String::new(),
        })
    }

    /// Next state after a filter change. `self` is untouched on error so the
    /// caller can keep showing the last valid view.
    pub fn apply(&self, update: FilterUpdate) -> Result<Self, ValidationError> {
        let num_videos = update.num_videos.unwrap_or(self.num_videos);
        if !(1..=MAX_TOP_VIDEOS).contains(&num_videos) {
            return Err(ValidationError::NumVideosOutOfRange {
                got: num_videos,
                max: MAX_TOP_VIDEOS,
            });
        }

        let date_range = DateRange::new(
            update.start_date.unwrap_or(self.date_range.start),
            update.end_date.unwrap_or(self.date_range.end),
        )?;

        let tag_query = update
            .tag
            .map(|tag| tag.trim().to_string())
            .unwrap_or_else(|| self.tag_query.clone());

        Ok(Self {
            num_videos,
            date_range,
            tag_query,
        })
    }
}

/// Keep videos published within `range`, preserving order
pub fn filter_by_date<'a>(
    videos: impl IntoIterator<Item = &'a VideoDetail>,
    range: &DateRange,
) -> Vec<&'a VideoDetail> {
    videos
        .into_iter()
        .filter(|video| range.contains(&video.published_date))
        .collect()
}

/// Keep videos carrying exactly `tag`; an empty tag keeps everything
pub fn filter_by_tag<'a>(
    videos: impl IntoIterator<Item = &'a VideoDetail>,
    tag: &str,
) -> Vec<&'a VideoDetail> {
    videos
        .into_iter()
        .filter(|video| tag.is_empty() || video.tags.iter().any(|t| t == tag))
        .collect()
}

/// `likes / views`, defined as 0 when the video has no views
pub fn like_to_view_ratio(video: &VideoDetail) -> f64 {
    if video.view_count == 0 {
        0.0
    } else {
        video.like_count as f64 / video.view_count as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Views,
    Likes,
    Comments,
}

impl Metric {
    pub fn of(self, video: &VideoDetail) -> u64 {
        match self {
            Metric::Views => video.view_count,
            Metric::Likes => video.like_count,
            Metric::Comments => video.comment_count,
        }
    }
}

/// The `n` largest by `metric`, descending. Ties keep input order.
pub fn top_n<'a>(videos: &[&'a VideoDetail], metric: Metric, n: usize) -> Vec<&'a VideoDetail> {
    let mut ranked = videos.to_vec();
    ranked.sort_by(|a, b| metric.of(b).cmp(&metric.of(a)));
    ranked.truncate(n);
    ranked
}

/// A filtered video with its derived columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoRow {
    pub id: String,
    pub title: String,
    pub thumbnail: String,
    pub published_date: DateTime<Utc>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub tags: Vec<String>,
    pub like_to_view_ratio: f64,
}

impl From<&VideoDetail> for VideoRow {
    fn from(video: &VideoDetail) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            thumbnail: video.thumbnail.clone(),
            published_date: video.published_date,
            view_count: video.view_count,
            like_count: video.like_count,
            comment_count: video.comment_count,
            tags: video.tags.clone(),
            like_to_view_ratio: like_to_view_ratio(video),
        }
    }
}

/// Everything the statistics widgets render for one filter state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filters: FilterState,
    pub rows: Vec<VideoRow>,
    pub top_by_views: Vec<VideoRow>,
    pub top_by_likes: Vec<VideoRow>,
    pub top_by_comments: Vec<VideoRow>,
    pub views_over_time: Vec<SeriesPoint>,
    pub like_to_view_over_time: Vec<SeriesPoint>,
    pub tag_frequencies: Vec<TagCount>,
}

/// Date filter, then tag filter, then three independent rankings
pub fn build_dashboard(details: &[VideoDetail], filters: &FilterState) -> DashboardView {
    let in_range = filter_by_date(details, &filters.date_range);
    let filtered = filter_by_tag(in_range, &filters.tag_query);

    let n = filters.num_videos as usize;
    let rows_of = |videos: Vec<&VideoDetail>| -> Vec<VideoRow> {
        videos.into_iter().map(VideoRow::from).collect()
    };

    let mut chronological = filtered.clone();
    chronological.sort_by_key(|video| video.published_date);

    DashboardView {
        filters: filters.clone(),
        top_by_views: rows_of(top_n(&filtered, Metric::Views, n)),
        top_by_likes: rows_of(top_n(&filtered, Metric::Likes, n)),
        top_by_comments: rows_of(top_n(&filtered, Metric::Comments, n)),
        views_over_time: chronological
            .iter()
            .map(|video| SeriesPoint::new(video.published_date, video.view_count as f64))
            .collect(),
        like_to_view_over_time: chronological
            .iter()
            .map(|video| SeriesPoint::new(video.published_date, like_to_view_ratio(video)))
            .collect(),
        tag_frequencies: tag_frequencies(filtered.iter().flat_map(|video| video.tags.iter())),
        rows: rows_of(filtered),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fake::Fake;
    use fake::faker::lorem::en::Sentence;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn video(id: &str, published: DateTime<Utc>, views: u64, tags: &[&str]) -> VideoDetail {
        VideoDetail {
            id: id.to_string(),
            title: Sentence(2..6).fake(),
            description: String::new(),
            thumbnail: String::new(),
            published_date: published,
            view_count: views,
            like_count: views / 10,
            comment_count: views / 100,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            duration_seconds: 0,
        }
    }

    fn random_videos(count: usize) -> Vec<VideoDetail> {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let offset_hours: i64 = (0..24 * 365).fake();
                let views: u64 = (0..1_000_000).fake();
                video(&format!("v{i}"), base + Duration::hours(offset_hours), views, &[])
            })
            .collect()
    }

    #[test]
    fn start_after_end_is_rejected() {
        let err = DateRange::new(day(2024, 5, 2), day(2024, 5, 1)).unwrap_err();
        assert!(matches!(err, ValidationError::StartAfterEnd { .. }));
        assert!(DateRange::new(day(2024, 5, 1), day(2024, 5, 1)).is_ok());
    }

    #[test]
    fn date_filter_includes_whole_end_day() {
        let late = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap();
        let videos = [
            video("in", late, 1, &[]),
            video("out", late + Duration::minutes(2), 1, &[]),
        ];
        let range = DateRange::new(day(2024, 3, 1), day(2024, 3, 31)).unwrap();

        let kept = filter_by_date(&videos, &range);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "in");
    }

    #[test]
    fn date_filter_is_a_subset_and_idempotent() {
        let videos = random_videos(200);
        for _ in 0..20 {
            let a = day(2023, 1, 1) + Duration::days((0..365).fake::<i64>());
            let b = day(2023, 1, 1) + Duration::days((0..365).fake::<i64>());
            let range = DateRange::new(a.min(b), a.max(b)).unwrap();

            let once = filter_by_date(&videos, &range);
            assert!(once.iter().all(|v| {
                let d = v.published_date.date_naive();
                range.start() <= d && d <= range.end()
            }));
            assert!(once.len() <= videos.len());

            let twice = filter_by_date(once.iter().copied(), &range);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn tag_filter_is_exact_membership() {
        let t = Utc::now();
        let videos = [
            video("a", t, 1, &["physics", "class 11"]),
            video("b", t, 1, &["physics wallah"]),
            video("c", t, 1, &[]),
        ];

        let kept: Vec<_> = filter_by_tag(&videos, "physics")
            .into_iter()
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(kept, ["a"]);
        assert_eq!(filter_by_tag(&videos, "").len(), 3);
        assert!(filter_by_tag(&videos, "Physics").is_empty());
    }

    #[test]
    fn top_two_by_views() {
        let t = Utc::now();
        let videos = [
            video("a", t, 100, &[]),
            video("b", t, 50, &[]),
            video("c", t, 200, &[]),
        ];
        let refs: Vec<_> = videos.iter().collect();

        let top: Vec<_> = top_n(&refs, Metric::Views, 2)
            .into_iter()
            .map(|v| v.view_count)
            .collect();

        assert_eq!(top, [200, 100]);
    }

    #[test]
    fn rankings_are_independent() {
        let t = Utc::now();
        let mut liked = video("liked", t, 10, &[]);
        liked.like_count = 1_000;
        let mut viewed = video("viewed", t, 5_000, &[]);
        viewed.like_count = 0;
        let details = vec![liked, viewed];
        let filters = FilterState {
            num_videos: 1,
            date_range: DateRange::spanning(&details).unwrap(),
            tag_query: String::new(),
        };

        let view = build_dashboard(&details, &filters);

        assert_eq!(view.top_by_views[0].id, "viewed");
        assert_eq!(view.top_by_likes[0].id, "liked");
        assert_eq!(view.rows.len(), 2);
    }

    #[test]
    fn ratio_is_zero_without_views() {
        let t = Utc::now();
        let mut silent = video("s", t, 0, &[]);
        silent.like_count = 3;

        assert_eq!(like_to_view_ratio(&silent), 0.0);
        assert_eq!(like_to_view_ratio(&video("v", t, 200, &[])), 0.1);
    }

    #[test]
    fn dashboard_series_are_chronological() {
        let base = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let details = vec![
            video("late", base + Duration::days(2), 30, &["exam"]),
            video("early", base, 10, &["exam", "tips"]),
        ];
        let filters = FilterState::initial(&details).unwrap();

        let view = build_dashboard(&details, &filters);

        let values: Vec<_> = view.views_over_time.iter().map(|p| p.value).collect();
        assert_eq!(values, [10.0, 30.0]);
        assert_eq!(view.rows[0].id, "late");
        assert_eq!(view.tag_frequencies[0].word, "exam");
        assert_eq!(view.tag_frequencies[0].count, 2);
    }

    #[test]
    fn apply_rejects_invalid_update_and_keeps_partial_fields() {
        let details = random_videos(5);
        let state = FilterState::initial(&details).unwrap();

        let updated = state
            .apply(FilterUpdate {
                num_videos: Some(25),
                tag: Some("  physics ".to_string()),
                ..FilterUpdate::default()
            })
            .unwrap();
        assert_eq!(updated.num_videos, 25);
        assert_eq!(updated.tag_query, "physics");
        assert_eq!(updated.date_range, state.date_range);

        let inverted = FilterUpdate {
            start_date: Some(state.date_range.end() + Duration::days(1)),
            ..FilterUpdate::default()
        };
        assert!(matches!(
            updated.apply(inverted),
            Err(ValidationError::StartAfterEnd { .. })
        ));
        assert!(matches!(
            updated.apply(FilterUpdate {
                num_videos: Some(0),
                ..FilterUpdate::default()
            }),
            Err(ValidationError::NumVideosOutOfRange { got: 0, .. })
        ));
    }

    #[test]
    fn no_videos_means_no_initial_state() {
        assert!(FilterState::initial(&[]).is_none());
    }
}
