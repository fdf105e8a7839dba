use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::InspectError;
use crate::stream::{ProcessInspector, ProcessState};

#[derive(Debug)]
pub enum PollOutcome {
    Resumed(ProcessState),
    Cancelled,
    /// Inspection failed; the process is presumed removed.
    Gone(InspectError),
}

/// Waits for a stopped process to come back.
#[derive(Clone)]
pub struct RestartPoller {
    inspector: Arc<dyn ProcessInspector>,
    interval: Duration,
}

impl RestartPoller {
    pub fn new(inspector: Arc<dyn ProcessInspector>, interval: Duration) -> Self {
        Self {
            inspector,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Inspects `process_id` once per interval until it is running again.
    ///
    /// The first inspection happens one interval after the call. Cancellation
    /// wins over a tick that is ready at the same time, and an inspection
    /// error ends polling for good.
    pub async fn wait_for_restart(&self, process_id: &str, cancel: &CancellationToken) -> PollOutcome {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            let inspected = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                res = self.inspector.inspect(process_id) => res,
            };

            match inspected {
                Ok(state) if state.running => return PollOutcome::Resumed(state),
                Ok(_) => {
                    tracing::trace!(process = %process_id, "still stopped");
                }
                Err(e) => return PollOutcome::Gone(e),
            }
        }
    }
}
