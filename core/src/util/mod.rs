pub mod time_ago;

pub use time_ago::{rfc3339_to_rfc1123, to_time_ago, to_time_ago_at, unix_to_date, LabelLength, TimeAgoParams};
