use analytics::MAX_FORECAST_HORIZON;
use chrono::TimeDelta;
use dashboard_service::DashboardConfig;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use youtube_api::{DEFAULT_API_BASE, DEFAULT_MAX_COMMENTS, DEFAULT_MAX_PLAYLIST_PAGES};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub api_base: String,
    pub request_timeout: Duration,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Read the process environment, after loading `.env` if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = DashboardConfig::default();

        let bind_addr = parse(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 8080)))?;
        let api_base = lookup("YOUTUBE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let cache_ttl = seconds(&lookup, "CACHE_TTL_SECS", defaults.cache_ttl)?;
        let session_idle_ttl = seconds(&lookup, "SESSION_IDLE_SECS", defaults.session_idle_ttl)?;
        let request_timeout_secs = positive(&lookup, "REQUEST_TIMEOUT_SECS", 30)?;
        let forecast_horizon = positive(&lookup, "FORECAST_HORIZON", defaults.forecast_horizon)?;
        if forecast_horizon > MAX_FORECAST_HORIZON {
            return Err(ConfigError::OutOfRange {
                name: "FORECAST_HORIZON",
                value: forecast_horizon,
                min: 1,
                max: MAX_FORECAST_HORIZON,
            });
        }

        Ok(Self {
            bind_addr,
            api_base,
            request_timeout: Duration::from_secs(request_timeout_secs as u64),
            dashboard: DashboardConfig {
                cache_ttl,
                page_size: positive(&lookup, "PAGE_SIZE", defaults.page_size)?,
                max_playlist_pages: positive(
                    &lookup,
                    "MAX_PLAYLIST_PAGES",
                    DEFAULT_MAX_PLAYLIST_PAGES,
                )?,
                forecast_horizon,
                max_comments: positive(&lookup, "MAX_COMMENTS", DEFAULT_MAX_COMMENTS)?,
                session_idle_ttl,
            },
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Non-negative whole seconds that fit a [`TimeDelta`]
fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: TimeDelta,
) -> Result<TimeDelta, ConfigError> {
    let secs: i64 = parse(lookup, name, default.num_seconds())?;
    if secs < 0 {
        return Err(ConfigError::Invalid {
            name,
            value: secs.to_string(),
        });
    }
    TimeDelta::try_seconds(secs).ok_or(ConfigError::Invalid {
        name,
        value: secs.to_string(),
    })
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    match parse(lookup, name, default)? {
        0 => Err(ConfigError::Zero { name }),
        n => Ok(n),
    }
}
