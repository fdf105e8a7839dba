//! Compact "time ago" labels (`5m`, `3 hours ago`).
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// seconds → minutes → hours → days → weeks → months → years
const CONVERSIONS: [f64; 6] = [60.0, 60.0, 24.0, 7.0, 4.34524, 12.0];
const SHORT_LABELS: [&str; 7] = ["s", "m", "h", "d", "w", "M", "y"];
const LONG_LABELS: [&str; 7] = [
    " second", " minute", " hour", " day", " week", " month", " year",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelLength {
    #[default]
    Short,
    Long,
}

#[derive(Debug, Clone, Default)]
pub struct TimeAgoParams {
    pub unix_timestamp: i64,
    /// RFC3339; takes precedence over `unix_timestamp` when set.
    pub timestamp: Option<String>,
    pub label_length: LabelLength,
    pub include_ago: bool,
}

pub fn to_time_ago(p: &TimeAgoParams) -> String {
    to_time_ago_at(p, Utc::now().timestamp())
}

/// Same as [`to_time_ago`] with an explicit "now" in Unix seconds.
///
/// Timestamps in the future clamp to zero seconds.
pub fn to_time_ago_at(p: &TimeAgoParams, now: i64) -> String {
    let timestamp = match p.timestamp.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(t) => t.timestamp(),
            Err(_) => return String::new(),
        },
        None => p.unix_timestamp,
    };

    let short = p.label_length == LabelLength::Short;
    let labels = if short { &SHORT_LABELS } else { &LONG_LABELS };
    let ago = if p.include_ago && !short { " ago" } else { "" };

    let mut delta = now.saturating_sub(timestamp).max(0) as f64;
    for (i, conversion) in CONVERSIONS.iter().enumerate() {
        if delta < *conversion {
            return render(delta, labels[i], short, ago);
        }
        delta /= conversion;
    }
    render(delta, labels[6], short, ago)
}

fn render(delta: f64, label: &str, short: bool, ago: &str) -> String {
    let n = delta as i64;
    format!("{n}{label}{}{ago}", plural(n, short))
}

fn plural(n: i64, short: bool) -> &'static str {
    if !short && n > 1 {
        "s"
    } else {
        ""
    }
}

pub fn unix_to_date(timestamp: i64, format: &str) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(t) => t.format(format).to_string(),
        None => String::new(),
    }
}

pub fn rfc3339_to_rfc1123(s: &str) -> Result<String, chrono::ParseError> {
    let t = DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc);
    Ok(t.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}
