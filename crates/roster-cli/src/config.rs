use std::path::{Path, PathBuf};
use std::time::Duration;

use roster::{DEFAULT_CRON, RetryPolicy, ScheduleTimezone};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "roster-ingestor";

/// Top-level application configuration. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: LogLevel,
    pub feed: FeedConfig,
    pub schedule: ScheduleConfig,
    pub retry: RetryConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".into())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub sport: String,
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sleeper.app/v1".into(),
            sport: "nfl".into(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub cron: String,
    pub timezone: ScheduleTimezone,
    pub run_on_startup: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: DEFAULT_CRON.into(),
            timezone: ScheduleTimezone::Local,
            run_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_secs: u64,
    pub max_delay_secs: u64,
    pub backoff_multiplier: f64,
    /// Upper bound on a single fetch attempt.
    pub fetch_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 5,
            max_delay_secs: 300,
            backoff_multiplier: 2.0,
            fetch_timeout_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            multiplier: self.backoff_multiplier,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Defaults to `<data dir>/roster-ingestor/players.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("could not determine a data directory; set database.path")]
    NoDataDir,
}

impl AppConfig {
    /// Apply `ROSTER_*` environment overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("ROSTER_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup("ROSTER_FEED_BASE_URL") {
            self.feed.base_url = url;
        }
    }

    /// Resolved database location.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR).join("players.db"))
                .ok_or(ConfigError::NoDataDir),
        }
    }
}

/// Config file path: `~/.config/roster-ingestor/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Load config from `path`, or the default location.
///
/// A missing file yields defaults; a file that exists but does not parse is
/// an error. Environment overrides are applied last.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => config_path(),
    };

    let mut config = match path {
        Some(path) if path.exists() => {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|source| ConfigError::Parse { path, source })?
        }
        _ => AppConfig::default(),
    };

    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}
