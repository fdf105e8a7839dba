//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `logtail_core::api` instead of reaching into internal modules.

pub use crate::config::{
    apply_env_overrides, load_default, load_from_path, AppConfig, DockerConfig, GuiConfig,
    LoggingConfig, LogsConfig, TailerConfig, TimeAgoConfig,
};
pub use crate::error::{CliError, ConfigError, FramingError, InspectError, StreamError, TaskError};
pub use crate::stream::{
    Channel, CopyOutcome, Frame, LogSource, LogStream, MuxCodec, ProcessHandle,
    ProcessInspector, ProcessState, Since, StreamOptions, Tail,
};
pub use crate::tail::{
    stream_logs, stream_until_interrupted, ClearBuffer, ClearScreen, Cycle, Flow, LogTailer,
    LogView, PeriodicTask, RestartPoller, SinkReset, SinkSlot, TailEvent, TailEventTx, TaskHandle,
    TerminateReason,
};
pub use crate::util::{
    rfc3339_to_rfc1123, to_time_ago, to_time_ago_at, unix_to_date, LabelLength, TimeAgoParams,
};
