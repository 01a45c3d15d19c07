//! INI-backed configuration file.
//!
//! The file lives at `~/.config/flowcast/config.ini` on Linux (see
//! [`config_file_path`]). Missing sections and keys fall back to the
//! defaults of the component they configure, so an empty file is valid.
//!
//! ```ini
//! [routing]
//! max_retries = 3
//! cooldown_ms = 500
//!
//! [traffic]
//! refresh_interval_secs = 120
//!
//! [provider]
//! base_url = https://router.project-osrm.org
//!
//! [logging]
//! level = info
//! directory = /var/log/flowcast
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::position::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use crate::provider::{DEFAULT_HTTP_TIMEOUT, DEFAULT_OSRM_URL};
use crate::routing::{
    DEFAULT_ARRIVAL_RADIUS_M, DEFAULT_COOLDOWN, DEFAULT_FALLBACK_DELAY, DEFAULT_MAX_DELAY,
    DEFAULT_MAX_RETRIES,
};
use crate::traffic::{
    DEFAULT_BEARING_COUNT, DEFAULT_INTER_REQUEST_DELAY, DEFAULT_MAX_CONCURRENT_REQUESTS,
    DEFAULT_MIN_GENERATION_INTERVAL, DEFAULT_RADIUS_DEG, DEFAULT_REFRESH_INTERVAL,
};

/// Default log level when neither the file nor `RUST_LOG` set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors from reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[routing]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingSettings {
    pub max_retries: u32,
    pub max_retry_delay: Duration,
    pub fallback_retry_delay: Duration,
    pub cooldown: Duration,
    pub position_poll_attempts: u32,
    pub position_poll_interval: Duration,
    pub arrival_radius_m: f64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_retry_delay: DEFAULT_MAX_DELAY,
            fallback_retry_delay: DEFAULT_FALLBACK_DELAY,
            cooldown: DEFAULT_COOLDOWN,
            position_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            position_poll_interval: DEFAULT_POLL_INTERVAL,
            arrival_radius_m: DEFAULT_ARRIVAL_RADIUS_M,
        }
    }
}

/// `[traffic]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficSettings {
    pub refresh_interval: Duration,
    pub min_interval: Duration,
    pub bearing_count: usize,
    pub radius_deg: f64,
    pub max_concurrent_requests: usize,
    pub inter_request_delay: Duration,
}

impl Default for TrafficSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            min_interval: DEFAULT_MIN_GENERATION_INTERVAL,
            bearing_count: DEFAULT_BEARING_COUNT,
            radius_deg: DEFAULT_RADIUS_DEG,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            inter_request_delay: DEFAULT_INTER_REQUEST_DELAY,
        }
    }
}

/// `[provider]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OSRM_URL.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    /// Directory for rolling log files. Stderr only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub routing: RoutingSettings,
    pub traffic: TrafficSettings,
    pub provider: ProviderSettings,
    pub logging: LoggingSettings,
}

/// Location of the configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flowcast")
        .join("config.ini")
}

impl ConfigFile {
    /// Load from [`config_file_path`]. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(err) => ConfigError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|section| section.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value.trim())?;
            }
        }
        Ok(config)
    }

    /// Write to [`config_file_path`], creating the directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Write to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if value.is_empty() {
                continue;
            }
            ini.with_section(Some(key.section()))
                .set(key.key_name(), value);
        }

        ini.write_to_file(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

// =============================================================================
// Keys
// =============================================================================

/// Every settable key, addressed as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    RoutingMaxRetries,
    RoutingMaxRetryDelaySecs,
    RoutingFallbackRetryDelaySecs,
    RoutingCooldownMs,
    RoutingPositionPollAttempts,
    RoutingPositionPollIntervalMs,
    RoutingArrivalRadiusM,
    TrafficRefreshIntervalSecs,
    TrafficMinIntervalSecs,
    TrafficBearingCount,
    TrafficRadiusDeg,
    TrafficMaxConcurrentRequests,
    TrafficInterRequestDelayMs,
    ProviderBaseUrl,
    ProviderTimeoutSecs,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in listing order, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            RoutingMaxRetries,
            RoutingMaxRetryDelaySecs,
            RoutingFallbackRetryDelaySecs,
            RoutingCooldownMs,
            RoutingPositionPollAttempts,
            RoutingPositionPollIntervalMs,
            RoutingArrivalRadiusM,
            TrafficRefreshIntervalSecs,
            TrafficMinIntervalSecs,
            TrafficBearingCount,
            TrafficRadiusDeg,
            TrafficMaxConcurrentRequests,
            TrafficInterRequestDelayMs,
            ProviderBaseUrl,
            ProviderTimeoutSecs,
            LoggingLevel,
            LoggingDirectory,
        ]
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            RoutingMaxRetries
            | RoutingMaxRetryDelaySecs
            | RoutingFallbackRetryDelaySecs
            | RoutingCooldownMs
            | RoutingPositionPollAttempts
            | RoutingPositionPollIntervalMs
            | RoutingArrivalRadiusM => "routing",
            TrafficRefreshIntervalSecs
            | TrafficMinIntervalSecs
            | TrafficBearingCount
            | TrafficRadiusDeg
            | TrafficMaxConcurrentRequests
            | TrafficInterRequestDelayMs => "traffic",
            ProviderBaseUrl | ProviderTimeoutSecs => "provider",
            LoggingLevel | LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            RoutingMaxRetries => "max_retries",
            RoutingMaxRetryDelaySecs => "max_retry_delay_secs",
            RoutingFallbackRetryDelaySecs => "fallback_retry_delay_secs",
            RoutingCooldownMs => "cooldown_ms",
            RoutingPositionPollAttempts => "position_poll_attempts",
            RoutingPositionPollIntervalMs => "position_poll_interval_ms",
            RoutingArrivalRadiusM => "arrival_radius_m",
            TrafficRefreshIntervalSecs => "refresh_interval_secs",
            TrafficMinIntervalSecs => "min_interval_secs",
            TrafficBearingCount => "bearing_count",
            TrafficRadiusDeg => "radius_deg",
            TrafficMaxConcurrentRequests => "max_concurrent_requests",
            TrafficInterRequestDelayMs => "inter_request_delay_ms",
            ProviderBaseUrl => "base_url",
            ProviderTimeoutSecs => "timeout_secs",
            LoggingLevel => "level",
            LoggingDirectory => "directory",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value rendered as a string. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let routing = &config.routing;
        let traffic = &config.traffic;
        match self {
            RoutingMaxRetries => routing.max_retries.to_string(),
            RoutingMaxRetryDelaySecs => routing.max_retry_delay.as_secs().to_string(),
            RoutingFallbackRetryDelaySecs => routing.fallback_retry_delay.as_secs().to_string(),
            RoutingCooldownMs => routing.cooldown.as_millis().to_string(),
            RoutingPositionPollAttempts => routing.position_poll_attempts.to_string(),
            RoutingPositionPollIntervalMs => routing.position_poll_interval.as_millis().to_string(),
            RoutingArrivalRadiusM => routing.arrival_radius_m.to_string(),
            TrafficRefreshIntervalSecs => traffic.refresh_interval.as_secs().to_string(),
            TrafficMinIntervalSecs => traffic.min_interval.as_secs().to_string(),
            TrafficBearingCount => traffic.bearing_count.to_string(),
            TrafficRadiusDeg => traffic.radius_deg.to_string(),
            TrafficMaxConcurrentRequests => traffic.max_concurrent_requests.to_string(),
            TrafficInterRequestDelayMs => traffic.inter_request_delay.as_millis().to_string(),
            ProviderBaseUrl => config.provider.base_url.clone(),
            ProviderTimeoutSecs => config.provider.timeout.as_secs().to_string(),
            LoggingLevel => config.logging.level.clone(),
            LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate and store a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let routing = &mut config.routing;
        let traffic = &mut config.traffic;
        match self {
            RoutingMaxRetries => routing.max_retries = self.parse(value)?,
            RoutingMaxRetryDelaySecs => routing.max_retry_delay = self.secs(value)?,
            RoutingFallbackRetryDelaySecs => routing.fallback_retry_delay = self.secs(value)?,
            RoutingCooldownMs => routing.cooldown = self.millis(value)?,
            RoutingPositionPollAttempts => {
                routing.position_poll_attempts = self.positive(value)?;
            }
            RoutingPositionPollIntervalMs => routing.position_poll_interval = self.millis(value)?,
            RoutingArrivalRadiusM => routing.arrival_radius_m = self.positive_f64(value)?,
            TrafficRefreshIntervalSecs => traffic.refresh_interval = self.secs(value)?,
            TrafficMinIntervalSecs => traffic.min_interval = self.secs(value)?,
            TrafficBearingCount => traffic.bearing_count = self.positive(value)?,
            TrafficRadiusDeg => traffic.radius_deg = self.positive_f64(value)?,
            TrafficMaxConcurrentRequests => {
                traffic.max_concurrent_requests = self.positive(value)?;
            }
            TrafficInterRequestDelayMs => traffic.inter_request_delay = self.millis(value)?,
            ProviderBaseUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(self.invalid(value, "expected an http(s) URL"));
                }
                config.provider.base_url = value.to_string();
            }
            ProviderTimeoutSecs => config.provider.timeout = self.secs(value)?,
            LoggingLevel => {
                let level = value.to_ascii_lowercase();
                if !matches!(
                    level.as_str(),
                    "trace" | "debug" | "info" | "warn" | "error"
                ) {
                    return Err(self.invalid(value, "expected trace, debug, info, warn or error"));
                }
                config.logging.level = level;
            }
            LoggingDirectory => {
                config.logging.directory = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn parse<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .parse::<T>()
            .map_err(|e| self.invalid(value, e.to_string()))
    }

    fn positive<T>(&self, value: &str) -> Result<T, ConfigError>
    where
        T: FromStr + Default + PartialEq,
        T::Err: std::fmt::Display,
    {
        let parsed: T = self.parse(value)?;
        if parsed == T::default() {
            return Err(self.invalid(value, "must be greater than zero"));
        }
        Ok(parsed)
    }

    fn positive_f64(&self, value: &str) -> Result<f64, ConfigError> {
        let parsed: f64 = self.parse(value)?;
        if !parsed.is_finite() || parsed <= 0.0 {
            return Err(self.invalid(value, "must be a positive number"));
        }
        Ok(parsed)
    }

    fn secs(&self, value: &str) -> Result<Duration, ConfigError> {
        self.parse::<u64>(value).map(Duration::from_secs)
    }

    fn millis(&self, value: &str) -> Result<Duration, ConfigError> {
        self.parse::<u64>(value).map(Duration::from_millis)
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}
