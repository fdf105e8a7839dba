use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;

use crate::config::TailerConfig;
use crate::error::TaskError;
use crate::stream::{LogSource, ProcessHandle, ProcessInspector, StreamOptions};

use super::events::TailEventTx;
use super::lease::SinkSlot;
use super::reset::SinkReset;
use super::restart::RestartPoller;
use super::tailer::LogTailer;
use super::task::{PeriodicTask, TaskHandle};

/// Owns a display sink and the (at most one) task currently writing to it.
///
/// Switching processes always stops the previous task and waits for its
/// acknowledgment before the sink is leased to the next one.
pub struct LogView<W> {
    slot: SinkSlot<W>,
    source: Arc<dyn LogSource>,
    inspector: Arc<dyn ProcessInspector>,
    task_interval: Duration,
    poll_interval: Duration,
    events: Option<TailEventTx>,
    reset: Option<Arc<dyn SinkReset<W>>>,
    current: Option<TaskHandle>,
}

impl<W> LogView<W>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(
        sink: W,
        source: Arc<dyn LogSource>,
        inspector: Arc<dyn ProcessInspector>,
        cfg: &TailerConfig,
    ) -> Self {
        Self {
            slot: SinkSlot::new(sink),
            source,
            inspector,
            task_interval: cfg.task_interval(),
            poll_interval: cfg.restart_poll_interval(),
            events: None,
            reset: None,
            current: None,
        }
    }

    pub fn with_events(mut self, events: TailEventTx) -> Self {
        self.events = Some(events);
        self
    }

    /// Clears the sink with `reset` before each session of every tailer this view starts.
    pub fn with_session_reset(mut self, reset: Arc<dyn SinkReset<W>>) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Starts following `process`, replacing whatever the view showed before.
    pub async fn show(&mut self, process: ProcessHandle, options: StreamOptions) {
        if let Err(e) = self.stop().await {
            tracing::warn!(error = %e, "previous log view ended abnormally");
        }

        let lease = self.slot.acquire().await;
        tracing::info!(process = %process.id, "following logs");

        let mut tailer = LogTailer::new(
            Arc::clone(&self.source),
            RestartPoller::new(Arc::clone(&self.inspector), self.poll_interval),
            process,
            options,
            lease,
        );
        if let Some(tx) = self.events.clone() {
            tailer = tailer.with_events(tx);
        }
        if let Some(reset) = self.reset.clone() {
            tailer = tailer.with_session_reset(reset);
        }

        self.current = Some(PeriodicTask::start(self.task_interval, None, tailer));
    }

    /// Stops the current task, if any, and waits until it has released the sink.
    pub async fn stop(&mut self) -> Result<(), TaskError> {
        match self.current.take() {
            Some(handle) => handle.stop().await,
            None => Ok(()),
        }
    }

    /// Waits for the current task to end by itself (process removed).
    pub async fn wait(&mut self) -> Result<(), TaskError> {
        match self.current.take() {
            Some(handle) => handle.wait().await,
            None => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn sink(&self) -> &SinkSlot<W> {
        &self.slot
    }
}
