use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::stream::{LogSource, ProcessHandle, StreamOptions};

use super::events::{emit, TailEvent, TailEventTx, TerminateReason};
use super::lease::SinkLease;
use super::reset::SinkReset;
use super::restart::{PollOutcome, RestartPoller};
use super::streamer::stream_logs;
use super::task::{Cycle, Flow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Streaming,
    Polling,
    Terminated,
}

/// Streams a process's logs, waits for it to restart when the stream ends, and repeats.
///
/// Each [`Cycle::run_cycle`] is one STREAMING → POLLING pass. It returns
/// `Flow::Continue` once the process is running again, so the driver starts
/// the next session on its next tick.
pub struct LogTailer<W> {
    source: Arc<dyn LogSource>,
    poller: RestartPoller,
    process: ProcessHandle,
    options: StreamOptions,
    sink: SinkLease<W>,
    events: Option<TailEventTx>,
    reset: Option<Arc<dyn SinkReset<W>>>,
    state: TailState,
    attempt: u64,
}

impl<W> LogTailer<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(
        source: Arc<dyn LogSource>,
        poller: RestartPoller,
        process: ProcessHandle,
        options: StreamOptions,
        sink: SinkLease<W>,
    ) -> Self {
        Self {
            source,
            poller,
            process,
            options,
            sink,
            events: None,
            reset: None,
            state: TailState::Streaming,
            attempt: 0,
        }
    }

    pub fn with_events(mut self, events: TailEventTx) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs `reset` on the sink before every session, so a replayed window
    /// replaces the previous session's output instead of repeating it.
    pub fn with_session_reset(mut self, reset: Arc<dyn SinkReset<W>>) -> Self {
        self.reset = Some(reset);
        self
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }

    fn terminate(&mut self, reason: TerminateReason) {
        self.state = TailState::Terminated;
        emit(
            self.events.as_ref(),
            TailEvent::Terminated {
                process: self.process.id.clone(),
                reason,
            },
        );
    }

    async fn stream_once(&mut self, stop: &CancellationToken) -> bool {
        self.state = TailState::Streaming;
        self.attempt += 1;
        if let Some(reset) = &self.reset {
            if let Err(e) = reset.reset(&mut *self.sink).await {
                tracing::warn!(process = %self.process.id, error = %e, "cannot reset log sink");
            }
        }
        emit(
            self.events.as_ref(),
            TailEvent::SessionStarted {
                process: self.process.id.clone(),
                attempt: self.attempt,
            },
        );

        let result = stream_logs(
            self.source.as_ref(),
            &self.process,
            &self.options,
            &mut *self.sink,
            stop,
        )
        .await;

        let (bytes, cancelled, error) = match result {
            Ok(outcome) => (outcome.total_bytes(), outcome.cancelled, None),
            Err(e) => {
                // The pane just stops updating; the error goes to the diagnostic log.
                tracing::error!(
                    process = %self.process.id,
                    attempt = self.attempt,
                    error.kind = "stream",
                    error.message = %e
                );
                (0, false, Some(e.to_string()))
            }
        };
        emit(
            self.events.as_ref(),
            TailEvent::SessionEnded {
                process: self.process.id.clone(),
                attempt: self.attempt,
                bytes,
                cancelled,
                error,
            },
        );
        cancelled
    }
}

#[async_trait]
impl<W> Cycle for LogTailer<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    async fn run_cycle(&mut self, stop: &CancellationToken) -> anyhow::Result<Flow> {
        if self.state == TailState::Terminated {
            return Ok(Flow::Done);
        }

        let cancelled = self.stream_once(stop).await;
        if cancelled || stop.is_cancelled() {
            self.terminate(TerminateReason::Cancelled);
            return Ok(Flow::Done);
        }

        self.state = TailState::Polling;
        emit(
            self.events.as_ref(),
            TailEvent::Polling {
                process: self.process.id.clone(),
            },
        );

        match self.poller.wait_for_restart(&self.process.id, stop).await {
            PollOutcome::Resumed(state) => {
                tracing::info!(process = %self.process.id, "process running again, resuming logs");
                self.process.snapshot = Some(state);
                self.state = TailState::Streaming;
                emit(
                    self.events.as_ref(),
                    TailEvent::Resumed {
                        process: self.process.id.clone(),
                    },
                );
                Ok(Flow::Continue)
            }
            PollOutcome::Cancelled => {
                self.terminate(TerminateReason::Cancelled);
                Ok(Flow::Done)
            }
            PollOutcome::Gone(e) => {
                self.terminate(TerminateReason::ProcessGone(e.to_string()));
                Err(anyhow::Error::new(e).context(format!(
                    "stopped following {}: process presumed removed",
                    self.process.id
                )))
            }
        }
    }
}
