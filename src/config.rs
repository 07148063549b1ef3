//! Runtime settings, read from the environment (and `.env`) with defaults.

use reqwest::Url;
use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::alert_signal::{DEFAULT_ACTIVE_DURATION, DEFAULT_FRESHNESS_WINDOW};
use crate::feed::{DEFAULT_FEED_PATH, DEFAULT_RECONNECT_DELAY, feed_url};
use crate::regions::{self, Region};
use crate::window::DEFAULT_WINDOW_CAPACITY;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

/// Upper bound for every configured delay or duration.
pub const MAX_CONFIGURED_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("unknown coastal region '{0}'")]
    UnknownRegion(String),

    #[error("{var} must be at most {max_secs}s, got {value:?}")]
    DurationOutOfRange {
        var: &'static str,
        max_secs: u64,
        value: Duration,
    },

    #[error("window capacity must be at least 1")]
    ZeroCapacity,

    #[error("dashboard origin '{0}' must use http(s) or ws(s)")]
    UnsupportedOrigin(String),
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub origin: Url,
    pub feed_path: String,
    pub window_capacity: usize,
    pub reconnect_delay: Duration,
    pub alert_freshness: Duration,
    pub alert_active_for: Duration,
    pub region: Region,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            origin: Url::parse(DEFAULT_ORIGIN).expect("default origin is a valid URL"),
            feed_path: DEFAULT_FEED_PATH.to_string(),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            alert_freshness: DEFAULT_FRESHNESS_WINDOW,
            alert_active_for: DEFAULT_ACTIVE_DURATION,
            region: regions::default_region(),
        }
    }
}

impl SyncConfig {
    /// Loads `.env` if present, then reads overrides from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(origin) = lookup("DASHBOARD_ORIGIN") {
            config.origin = Url::parse(&origin).map_err(|_| ConfigError::InvalidValue {
                var: "DASHBOARD_ORIGIN",
                expected: "a URL",
                value: origin.clone(),
            })?;
        }
        if let Some(path) = lookup("FEED_PATH") {
            config.feed_path = path;
        }
        if let Some(v) = lookup("SYNC_WINDOW_CAPACITY") {
            config.window_capacity = parse_number("SYNC_WINDOW_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(parse_number("RECONNECT_DELAY_MS", &v)?);
        }
        if let Some(v) = lookup("ALERT_FRESHNESS_SECS") {
            config.alert_freshness = Duration::from_secs(parse_number("ALERT_FRESHNESS_SECS", &v)?);
        }
        if let Some(v) = lookup("ALERT_ACTIVE_SECS") {
            config.alert_active_for = Duration::from_secs(parse_number("ALERT_ACTIVE_SECS", &v)?);
        }
        if let Some(name) = lookup("DEFAULT_REGION") {
            config.region = regions::find(&name).ok_or(ConfigError::UnknownRegion(name))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        for (var, value) in [
            ("RECONNECT_DELAY_MS", self.reconnect_delay),
            ("ALERT_FRESHNESS_SECS", self.alert_freshness),
            ("ALERT_ACTIVE_SECS", self.alert_active_for),
        ] {
            if value > MAX_CONFIGURED_DURATION {
                return Err(ConfigError::DurationOutOfRange {
                    var,
                    max_secs: MAX_CONFIGURED_DURATION.as_secs(),
                    value,
                });
            }
        }
        if !matches!(self.origin.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::UnsupportedOrigin(self.origin.to_string()));
        }
        Ok(())
    }

    /// Socket URL of the telemetry feed for this origin.
    pub fn feed_url(&self) -> anyhow::Result<Url> {
        feed_url(&self.origin, &self.feed_path)
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        expected: "a non-negative integer",
        value: value.to_string(),
    })
}
