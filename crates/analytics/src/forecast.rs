//! Inputs and outputs of the view forecast.
//!
//! Model fitting sits behind [`Forecaster`]; this module only prepares the
//! `(date, value)` history and shapes what comes back for display.

use chrono::{DateTime, Duration, Utc};
use domain::VideoDetail;
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// Window of actual values shown next to the prediction
const RECENT_ACTUALS_DAYS: i64 = 30;

/// Longest accepted horizon, in daily periods (about ten years)
pub const MAX_FORECAST_HORIZON: usize = 3_650;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: DateTime<Utc>, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastError {
    #[error("Not enough history to forecast: need two distinct dates, have {distinct_dates}")]
    InsufficientHistory { distinct_dates: usize },
    #[error("Forecast horizon must be at least one period")]
    EmptyHorizon,
    #[error("Forecast horizon of {horizon} periods exceeds the maximum of {max}")]
    HorizonTooLong { horizon: usize, max: usize },
    #[error("Forecast dates run past the supported calendar range")]
    DateOutOfRange,
}

/// Date `days` after `date`, if representable
fn days_after(date: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, ForecastError> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or(ForecastError::DateOutOfRange)
}

/// What a forecasting collaborator returns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    /// Model values at the historical dates
    pub fitted: Vec<SeriesPoint>,
    /// One point per future period, in date order
    pub predicted: Vec<SeriesPoint>,
}

/// Fits a model to `history` (date order) and predicts `horizon` daily
/// periods after its last date.
pub trait Forecaster: Send + Sync {
    fn forecast(&self, history: &[SeriesPoint], horizon: usize) -> Result<Forecast, ForecastError>;
}

/// Least-squares straight line over day offsets, clamped at zero
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrendForecaster;

fn day_offset(origin: DateTime<Utc>, date: DateTime<Utc>) -> f64 {
    (date - origin).num_seconds() as f64 / 86_400.0
}

impl Forecaster for LinearTrendForecaster {
    fn forecast(&self, history: &[SeriesPoint], horizon: usize) -> Result<Forecast, ForecastError> {
        if horizon == 0 {
            return Err(ForecastError::EmptyHorizon);
        }
        if horizon > MAX_FORECAST_HORIZON {
            return Err(ForecastError::HorizonTooLong {
                horizon,
                max: MAX_FORECAST_HORIZON,
            });
        }
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Err(ForecastError::InsufficientHistory { distinct_dates: 0 });
        };
        if first.date == last.date {
            return Err(ForecastError::InsufficientHistory { distinct_dates: 1 });
        }

        let origin = first.date;
        let n = history.len() as f64;
        let xs: Vec<f64> = history.iter().map(|p| day_offset(origin, p.date)).collect();
        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = history.iter().map(|p| p.value).sum::<f64>() / n;

        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, point) in xs.iter().zip(history) {
            sxy += (x - mean_x) * (point.value - mean_y);
            sxx += (x - mean_x) * (x - mean_x);
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        debug!("Linear trend: {slope:.3} views/day, intercept {intercept:.1}");

        let at = |x: f64| (intercept + slope * x).max(0.0);

        let fitted = history
            .iter()
            .zip(&xs)
            .map(|(point, x)| SeriesPoint::new(point.date, at(*x)))
            .collect();
        let predicted = (1..=horizon as i64)
            .map(|k| {
                let date = days_after(last.date, k)?;
                Ok(SeriesPoint::new(date, at(day_offset(origin, date))))
            })
            .collect::<Result<_, ForecastError>>()?;

        Ok(Forecast { fitted, predicted })
    }
}

/// `(published_date, view_count)` of every video, oldest first
pub fn view_history(details: &[VideoDetail]) -> Vec<SeriesPoint> {
    let mut history: Vec<SeriesPoint> = details
        .iter()
        .map(|video| SeriesPoint::new(video.published_date, video.view_count as f64))
        .collect();
    history.sort_by_key(|point| point.date);
    history
}

/// Payload of the forecast chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastView {
    /// Actual values from the 30 days up to the last observation
    pub recent_actuals: Vec<SeriesPoint>,
    pub fitted: Vec<SeriesPoint>,
    pub predicted: Vec<SeriesPoint>,
}

pub fn forecast_view(
    details: &[VideoDetail],
    forecaster: &dyn Forecaster,
    horizon: usize,
) -> Result<ForecastView, ForecastError> {
    let history = view_history(details);
    let forecast = forecaster.forecast(&history, horizon)?;

    let recent_actuals = match history.last() {
        Some(last) => {
            let cutoff = last
                .date
                .checked_sub_signed(Duration::days(RECENT_ACTUALS_DAYS));
            history
                .iter()
                .filter(|point| cutoff.is_none_or(|cutoff| point.date > cutoff))
                .copied()
                .collect()
        }
        None => Vec::new(),
    };

    Ok(ForecastView {
        recent_actuals,
        fitted: forecast.fitted,
        predicted: forecast.predicted,
    })
}
