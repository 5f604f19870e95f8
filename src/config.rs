//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Stream session cadence and limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Interval between incremental synchronizer ticks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Interval between keep-alive comment frames.
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u64,
    /// Upper bound on a single stream's lifetime; 0 means no limit.
    #[serde(default)]
    pub max_session_seconds: u64,
    /// Frames buffered between the session tasks and the HTTP body.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            heartbeat_interval_seconds: default_heartbeat_interval_seconds(),
            max_session_seconds: 0,
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl StreamConfig {
    /// Poll tick interval as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Heartbeat interval as a [`Duration`].
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Maximum session lifetime, or `None` when unbounded.
    #[must_use]
    pub fn max_session(&self) -> Option<Duration> {
        (self.max_session_seconds > 0).then(|| Duration::from_secs(self.max_session_seconds))
    }
}

/// In-process worker pacing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Delay between consecutive worker steps (section start, turn, completion).
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            turn_delay_ms: default_turn_delay_ms(),
        }
    }
}

impl WorkerConfig {
    /// Step delay as a [`Duration`].
    #[must_use]
    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_heartbeat_interval_seconds() -> u64 {
    15
}

fn default_channel_capacity() -> usize {
    64
}

fn default_turn_delay_ms() -> u64 {
    750
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    3000
}

fn default_retention_days() -> u32 {
    30
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// HTTP port for the streaming API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// `SQLite` database file, or `:memory:` for an ephemeral store.
    pub db_path: PathBuf,
    /// Days after a meeting ends before its records are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Stream session settings.
    #[serde(default)]
    pub stream: StreamConfig,
    /// In-process worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Whether the configured database lives only in memory.
    #[must_use]
    pub fn uses_memory_db(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }

    fn validate(&self) -> Result<()> {
        if self.db_path.as_os_str().is_empty() {
            return Err(AppError::Config("db_path must not be empty".into()));
        }

        if self.stream.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "stream.poll_interval_ms must be greater than zero".into(),
            ));
        }

        if self.stream.heartbeat_interval_seconds == 0 {
            return Err(AppError::Config(
                "stream.heartbeat_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.stream.channel_capacity == 0 {
            return Err(AppError::Config(
                "stream.channel_capacity must be greater than zero".into(),
            ));
        }

        if self.retention_days == 0 {
            return Err(AppError::Config(
                "retention_days must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
