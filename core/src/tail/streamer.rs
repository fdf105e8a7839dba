use std::future::Future;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::stream::{demux_copy, raw_copy, CopyOutcome, LogSource, Merged, ProcessHandle, StreamOptions};

/// Streams one session of logs for `process` into `sink`.
///
/// Returns when the source reports end of stream (usually because the process
/// exited) or when `cancel` fires. The opened stream is closed on every path.
pub async fn stream_logs<W>(
    source: &dyn LogSource,
    process: &ProcessHandle,
    options: &StreamOptions,
    sink: &mut W,
    cancel: &CancellationToken,
) -> Result<CopyOutcome, StreamError>
where
    W: AsyncWrite + Send + Unpin,
{
    let cancelled = CopyOutcome {
        cancelled: true,
        ..CopyOutcome::default()
    };

    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(cancelled),
        res = source.open(&process.id, options) => res?,
    };

    let raw = stream
        .raw_terminal()
        .unwrap_or_else(|| process.is_raw_terminal());
    tracing::debug!(process = %process.id, source = source.name(), raw, "log stream opened");

    let result = if raw {
        raw_copy(&mut stream, sink, cancel).await
    } else {
        demux_copy(&mut stream, &mut Merged(sink), cancel).await
    };

    if let Err(e) = stream.close().await {
        tracing::warn!(process = %process.id, error = %e, "closing log stream failed");
    }
    drop(stream);

    match &result {
        Ok(outcome) => tracing::debug!(
            process = %process.id,
            bytes = outcome.total_bytes(),
            cancelled = outcome.cancelled,
            "log stream ended"
        ),
        Err(e) => tracing::debug!(process = %process.id, error = %e, "log stream failed"),
    }
    result
}

/// Streams once, stopping when `interrupt` resolves.
///
/// Used for plain terminal output: there is no restart handling and errors go
/// straight back to the caller.
pub async fn stream_until_interrupted<W, F>(
    source: &dyn LogSource,
    process: &ProcessHandle,
    options: &StreamOptions,
    sink: &mut W,
    interrupt: F,
) -> Result<CopyOutcome, StreamError>
where
    W: AsyncWrite + Send + Unpin,
    F: Future<Output = ()> + Send + 'static,
{
    let cancel = CancellationToken::new();
    let forwarder = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = interrupt => {
                    tracing::debug!("interrupted, cancelling log stream");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        })
    };

    let result = stream_logs(source, process, options, sink, &cancel).await;

    cancel.cancel();
    let _ = forwarder.await;
    result
}
