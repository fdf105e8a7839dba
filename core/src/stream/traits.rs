use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::{InspectError, StreamError};

use super::types::{ProcessState, StreamOptions};

/// An open log subscription. Dropping it must not be the only way to release it:
/// callers always `close` the stream once they are done reading.
#[async_trait]
pub trait LogStream: AsyncRead + Send + Unpin {
    async fn close(&mut self) -> std::io::Result<()>;

    /// Whether the bytes are an unframed terminal stream, when the source knows.
    /// `None` leaves the decision to the process snapshot.
    fn raw_terminal(&self) -> Option<bool> {
        None
    }
}

#[async_trait]
pub trait LogSource: Send + Sync {
    fn name(&self) -> &str;

    async fn open(
        &self,
        process_id: &str,
        options: &StreamOptions,
    ) -> Result<Box<dyn LogStream>, StreamError>;
}

#[async_trait]
pub trait ProcessInspector: Send + Sync {
    async fn inspect(&self, process_id: &str) -> Result<ProcessState, InspectError>;
}
