//! Preparing the sink before each streaming session.
//!
//! A resumed session replays whatever the `since`/`tail` window still covers,
//! so a view that keeps its old output would show that history again.
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Erase sequence plus scrollback clear and cursor home.
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[3J\x1b[H";

#[async_trait]
pub trait SinkReset<W>: Send + Sync {
    async fn reset(&self, sink: &mut W) -> std::io::Result<()>;
}

/// Empties an in-memory pane.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearBuffer;

#[async_trait]
impl SinkReset<Vec<u8>> for ClearBuffer {
    async fn reset(&self, sink: &mut Vec<u8>) -> std::io::Result<()> {
        sink.clear();
        Ok(())
    }
}

/// Clears a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClearScreen;

#[async_trait]
impl<W> SinkReset<W> for ClearScreen
where
    W: AsyncWrite + Send + Unpin,
{
    async fn reset(&self, sink: &mut W) -> std::io::Result<()> {
        sink.write_all(CLEAR_SCREEN).await?;
        sink.flush().await
    }
}
