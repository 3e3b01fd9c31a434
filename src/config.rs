use std::{str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::{dashboard::PollSchedule, weather::WeatherSchedule};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the appliance backend, without a trailing slash
    pub api_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Status polling period in seconds
    pub status_poll_interval_secs: u64,
    /// Delay after a healthy weather reading, in seconds
    pub weather_refresh_secs: u64,
    /// Delay after a failed or degraded weather reading, in seconds
    pub weather_retry_secs: u64,
    /// Chart points kept in memory
    pub history_capacity: usize,
    /// Per-request timeout for backend calls, in seconds
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Self {
            api_url: optional("DASHBOARD_API_URL", "http://127.0.0.1:8000")
                .trim_end_matches('/')
                .to_owned(),
            server_host: optional("SERVER_HOST", "127.0.0.1"),
            server_port: positive("SERVER_PORT", &optional("SERVER_PORT", "8080"))?,
            status_poll_interval_secs: positive(
                "STATUS_POLL_INTERVAL_SECS",
                &optional("STATUS_POLL_INTERVAL_SECS", "10"),
            )?,
            weather_refresh_secs: positive(
                "WEATHER_REFRESH_SECS",
                &optional("WEATHER_REFRESH_SECS", "900"),
            )?,
            weather_retry_secs: positive("WEATHER_RETRY_SECS", &optional("WEATHER_RETRY_SECS", "10"))?,
            history_capacity: positive("HISTORY_CAPACITY", &optional("HISTORY_CAPACITY", "360"))?,
            http_timeout_secs: positive("HTTP_TIMEOUT_SECS", &optional("HTTP_TIMEOUT_SECS", "5"))?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            status_interval: Duration::from_secs(self.status_poll_interval_secs),
            history_capacity: self.history_capacity,
            weather: WeatherSchedule {
                refresh: Duration::from_secs(self.weather_refresh_secs),
                retry: Duration::from_secs(self.weather_retry_secs),
            },
        }
    }
}

fn positive<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: T = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer, got {raw:?}"))?;
    if value == T::default() {
        bail!("{key} must be a positive integer, got 0");
    }
    Ok(value)
}
