use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::stream::{Since, StreamOptions, Tail};
use crate::util::time_ago::LabelLength;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    #[serde(default)]
    pub gui: GuiConfig,

    #[serde(default)]
    pub tailer: TailerConfig,

    #[serde(default)]
    pub docker: DockerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "logtail_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// What to ask the log source for on every streaming attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default)]
    pub timestamps: bool,

    /// Relative duration ("60m", "1h30m"), RFC3339 time, Unix seconds, or empty for no cutoff.
    #[serde(default = "default_since")]
    pub since: String,

    /// "all" or a line count.
    #[serde(default = "default_tail")]
    pub tail: String,
}

fn default_since() -> String {
    "60m".to_string()
}

fn default_tail() -> String {
    "all".to_string()
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            timestamps: false,
            since: default_since(),
            tail: default_tail(),
        }
    }
}

impl LogsConfig {
    pub fn stream_options(&self) -> Result<StreamOptions, ConfigError> {
        Ok(StreamOptions {
            include_timestamps: self.timestamps,
            since: self.since.parse::<Since>()?,
            tail: self.tail.parse::<Tail>()?,
            follow: true,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuiConfig {
    /// Skip the "press enter to return" prompt after standalone output.
    #[serde(default)]
    pub return_immediately: bool,

    #[serde(default)]
    pub time_ago: TimeAgoConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeAgoConfig {
    #[serde(default)]
    pub label_length: LabelLength,

    #[serde(default)]
    pub include_ago: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TailerConfig {
    /// Tick of the periodic driver between stream/poll cycles.
    #[serde(default = "default_task_interval_ms")]
    pub task_interval_ms: u64,

    /// How often a stopped process is inspected for a restart.
    #[serde(default = "default_restart_poll_interval_ms")]
    pub restart_poll_interval_ms: u64,
}

fn default_task_interval_ms() -> u64 {
    200
}

fn default_restart_poll_interval_ms() -> u64 {
    100
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            task_interval_ms: default_task_interval_ms(),
            restart_poll_interval_ms: default_restart_poll_interval_ms(),
        }
    }
}

impl TailerConfig {
    pub fn task_interval(&self) -> Duration {
        Duration::from_millis(self.task_interval_ms.max(1))
    }

    pub fn restart_poll_interval(&self) -> Duration {
        Duration::from_millis(self.restart_poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_docker_binary")]
    pub binary: String,
}

fn default_docker_binary() -> String {
    "docker".to_string()
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: default_docker_binary(),
        }
    }
}
