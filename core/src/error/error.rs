use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("stream failed: {0}")]
    Stream(#[from] StreamError),
    #[error("inspect failed: {0}")]
    Inspect(#[from] InspectError),
    #[error("task failed: {0}")]
    Task(#[from] TaskError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Everything that can end a single streaming session.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("open log stream for {process}: {reason}")]
    Open { process: String, reason: String },
    #[error("read log stream: {0}")]
    Read(#[source] std::io::Error),
    #[error("write to sink: {0}")]
    Write(#[source] std::io::Error),
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        StreamError::Read(e)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("unrecognized channel tag {0} in frame header")]
    UnknownChannel(u8),
    #[error("stream ended inside a frame ({buffered} of {expected} bytes)")]
    Truncated { buffered: usize, expected: usize },
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },
    #[error("error from log daemon: {0}")]
    Remote(String),
}

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("process {0} not found")]
    NotFound(String),
    #[error("inspect {process}: {reason}")]
    Failed { process: String, reason: String },
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task exited without acknowledging stop")]
    AckDropped,
    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid `since` value: {0}")]
    InvalidSince(String),
    #[error("invalid `tail` value: {0}")]
    InvalidTail(String),
}
