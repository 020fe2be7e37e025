use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_ALERT_THRESHOLD: f64 = 1000.0;
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MA_PERIOD: usize = 20;
pub const DEFAULT_TREND_LONG_PERIOD: usize = 50;
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_FIXED_PRICE: f64 = 1234.56;

/// Settings for the alert pipeline. Split out of [`Config`] so the pipeline
/// can be built without the batch/server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub tickers: Vec<String>,
    pub poll_interval: Duration,
    pub alert_threshold: f64,
    pub queue_capacity: usize,
    pub fetch_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub data_file: Option<PathBuf>,
    pub ma_period: usize,
    pub trend_long_period: usize,
    pub server_port: u16,
    pub fixed_price: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            data_file: None,
            ma_period: DEFAULT_MA_PERIOD,
            trend_long_period: DEFAULT_TREND_LONG_PERIOD,
            server_port: DEFAULT_SERVER_PORT,
            fixed_price: DEFAULT_FIXED_PRICE,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first if a
    /// `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset and blank values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let tickers = get("STOCK_SYMBOLS")
            .map(|raw| parse_tickers(&raw))
            .unwrap_or_default();

        let poll_secs: u64 = parse_positive(
            get("POLL_INTERVAL_SECS"),
            "POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL.as_secs(),
        )?;
        let fetch_secs: u64 = parse_positive(
            get("FETCH_TIMEOUT_SECS"),
            "FETCH_TIMEOUT_SECS",
            DEFAULT_FETCH_TIMEOUT.as_secs(),
        )?;
        let queue_capacity = parse_positive(
            get("ALERT_QUEUE_CAPACITY"),
            "ALERT_QUEUE_CAPACITY",
            DEFAULT_QUEUE_CAPACITY,
        )?;
        let alert_threshold = parse_price(
            get("ALERT_THRESHOLD"),
            "ALERT_THRESHOLD",
            DEFAULT_ALERT_THRESHOLD,
        )?;

        let ma_period = parse_positive(get("MA_PERIOD"), "MA_PERIOD", DEFAULT_MA_PERIOD)?;
        let trend_long_period = parse_positive(
            get("TREND_LONG_PERIOD"),
            "TREND_LONG_PERIOD",
            DEFAULT_TREND_LONG_PERIOD,
        )?;
        let server_port = parse_value(get("SERVER_PORT"), "SERVER_PORT", DEFAULT_SERVER_PORT)?;
        let fixed_price = parse_price(get("FIXED_PRICE"), "FIXED_PRICE", DEFAULT_FIXED_PRICE)?;

        Ok(Self {
            monitor: MonitorConfig {
                tickers,
                poll_interval: Duration::from_secs(poll_secs),
                alert_threshold,
                queue_capacity,
                fetch_timeout: Duration::from_secs(fetch_secs),
            },
            data_file: get("DATA_FILE").map(PathBuf::from),
            ma_period,
            trend_long_period,
            server_port,
            fixed_price,
        })
    }
}

/// Splits a comma-separated ticker list, trimming whitespace and dropping
/// empty entries. Order is preserved.
pub fn parse_tickers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_value<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError {
            key,
            value: value.clone(),
            reason: e.to_string(),
        }),
    }
}

fn parse_positive<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = parse_value(raw, key, default)?;
    if value <= T::default() {
        return Err(ConfigError {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_price(raw: Option<String>, key: &'static str, default: f64) -> Result<f64, ConfigError> {
    let shown = raw.clone().unwrap_or_default();
    let value = parse_value(raw, key, default)?;
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError {
            key,
            value: shown,
            reason: "must be a finite, non-negative amount".to_string(),
        });
    }
    Ok(value)
}
