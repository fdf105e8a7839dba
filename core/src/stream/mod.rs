pub mod demux;
mod traits;
mod types;

pub use demux::{demux_copy, raw_copy, Channel, ChannelSink, CopyOutcome, Frame, Merged, MuxCodec, Split};
pub use traits::{LogSource, LogStream, ProcessInspector};
pub use types::{ProcessHandle, ProcessState, Since, StreamOptions, Tail};
