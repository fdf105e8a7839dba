mod events;
mod lease;
mod reset;
mod restart;
mod streamer;
mod tailer;
mod task;
mod view;

pub use events::{TailEvent, TailEventTx, TerminateReason};
pub use lease::{SinkBusy, SinkLease, SinkSlot};
pub use reset::{ClearBuffer, ClearScreen, SinkReset};
pub use restart::{PollOutcome, RestartPoller};
pub use streamer::{stream_logs, stream_until_interrupted};
pub use tailer::{LogTailer, TailState};
pub use task::{Cycle, Flow, PeriodicTask, TaskHandle};
pub use view::LogView;
