use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::ConfigError;

/// Last-known lifecycle state of a process, as reported by a `ProcessInspector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessState {
    pub running: bool,
    /// Output is a raw terminal stream rather than stdout/stderr frames.
    pub tty: bool,
}

/// Identifier of the process being tailed plus a cached state snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub id: String,
    pub snapshot: Option<ProcessState>,
}

impl ProcessHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, state: ProcessState) -> Self {
        self.snapshot = Some(state);
        self
    }

    /// Only trust the tty flag once details have been loaded.
    pub fn is_raw_terminal(&self) -> bool {
        self.snapshot.map(|s| s.tty).unwrap_or(false)
    }
}

/// Cutoff before which log lines are not requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Since {
    #[default]
    None,
    Absolute(DateTime<Utc>),
    Relative(Duration),
}

impl Since {
    /// Render the cutoff the way log daemons accept it (`90s`, `1500ms` or Unix seconds).
    pub fn to_arg(&self) -> Option<String> {
        match self {
            Since::None => None,
            Since::Absolute(t) => Some(t.timestamp().to_string()),
            Since::Relative(d) if d.subsec_nanos() == 0 => Some(format!("{}s", d.as_secs())),
            // Sub-second precision would be lost in whole seconds.
            Since::Relative(d) => Some(format!("{}ms", d.as_millis().max(1))),
        }
    }
}

impl FromStr for Since {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Since::None);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            let secs: i64 = s
                .parse()
                .map_err(|_| ConfigError::InvalidSince(s.to_string()))?;
            return Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(Since::Absolute)
                .ok_or_else(|| ConfigError::InvalidSince(s.to_string()));
        }
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Ok(Since::Absolute(t.with_timezone(&Utc)));
        }
        humantime::parse_duration(s)
            .map(Since::Relative)
            .map_err(|_| ConfigError::InvalidSince(s.to_string()))
    }
}

/// How much history to replay before following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tail {
    #[default]
    All,
    Lines(u64),
}

impl fmt::Display for Tail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tail::All => f.write_str("all"),
            Tail::Lines(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Tail {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Tail::All);
        }
        s.parse::<u64>()
            .map(Tail::Lines)
            .map_err(|_| ConfigError::InvalidTail(s.to_string()))
    }
}

/// Options for one streaming attempt. Built once, never changed mid-stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOptions {
    pub include_timestamps: bool,
    pub since: Since,
    pub tail: Tail,
    pub follow: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            include_timestamps: false,
            since: Since::None,
            tail: Tail::All,
            follow: true,
        }
    }
}
