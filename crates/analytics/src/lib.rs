//! Pure functions over fetched channel data: filtering, ranking, search,
//! pagination, and the inputs/outputs of forecasting.
//!
//! Nothing in here performs I/O. Every UI event maps to a function that takes
//! the current state and returns the next one.

pub mod comments;
pub mod export;
pub mod filter;
pub mod forecast;
pub mod search;
pub mod tags;
pub mod video;

pub use filter::{
    DashboardView, DateRange, FilterState, FilterUpdate, MAX_TOP_VIDEOS, Metric, VideoRow,
    build_dashboard, filter_by_date, filter_by_tag, like_to_view_ratio, top_n,
};
pub use forecast::{
    Forecast, ForecastError, ForecastView, Forecaster, LinearTrendForecaster, MAX_FORECAST_HORIZON,
    SeriesPoint, forecast_view, view_history,
};
pub use comments::{
    CommentSummary, CommenterCount, ScoredComment, Sentiment, SentimentCounts, sentiment_score,
    strip_html, summarize_comments,
};
pub use export::{ExportError, comments_csv, videos_csv};
pub use search::{PageWindow, SearchPage, SearchState, search_stubs};
pub use tags::{TagCount, tag_frequencies};
pub use video::{
    PerformanceRating, SeoRating, VideoAnalytics, description_seo_score, format_duration,
    title_seo_score, video_analytics,
};

use chrono::NaiveDate;
use thiserror::Error;

/// A user-supplied filter that cannot be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Start date should be earlier than end date ({start} > {end}).")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("Number of top videos must be between 1 and {max}, got {got}.")]
    NumVideosOutOfRange { got: u32, max: u32 },
}
