//! Cancellable periodic driver with a two-phase stop.
//!
//! `PeriodicTask::start` runs a [`Cycle`] on a tick until the cycle reports it
//! is done or the owner calls [`TaskHandle::stop`]. Stopping sends a single
//! request and then waits for the task's acknowledgment, which is sent exactly
//! once after the cycle (and anything it owns) has been dropped, including when
//! the cycle fails or panics.
use std::any::Any;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run the cycle again on the next tick.
    Continue,
    Done,
}

#[async_trait]
pub trait Cycle: Send + 'static {
    /// One unit of work. Must return promptly once `stop` is cancelled.
    async fn run_cycle(&mut self, stop: &CancellationToken) -> anyhow::Result<Flow>;
}

pub struct PeriodicTask;

impl PeriodicTask {
    pub fn start<C: Cycle>(interval: Duration, initial_delay: Option<Duration>, work: C) -> TaskHandle {
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (stopped_tx, stopped_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let ack = AckOnDrop(Some(stopped_tx));
            let cancel = CancellationToken::new();
            let _release_forwarder = cancel.clone().drop_guard();
            let forwarder = tokio::spawn(forward_stop(stop_rx, cancel.clone()));

            let mut work = work;
            drive(interval, initial_delay, &mut work, &cancel).await;

            cancel.cancel();
            let _ = forwarder.await;
            drop(work);
            drop(ack);
        });

        TaskHandle {
            stop_tx,
            stopped_rx,
            join,
        }
    }
}

pub struct TaskHandle {
    stop_tx: oneshot::Sender<()>,
    stopped_rx: oneshot::Receiver<()>,
    join: JoinHandle<()>,
}

impl TaskHandle {
    /// Requests a stop and waits for the task to confirm it has torn down.
    pub async fn stop(self) -> Result<(), TaskError> {
        let TaskHandle {
            stop_tx,
            stopped_rx,
            join,
        } = self;
        // Err only means the task already finished on its own; its ack is still pending for us.
        let _ = stop_tx.send(());
        finish(stopped_rx, join).await
    }

    /// Waits for the task to finish on its own.
    pub async fn wait(self) -> Result<(), TaskError> {
        let TaskHandle {
            stop_tx,
            stopped_rx,
            join,
        } = self;
        let res = finish(stopped_rx, join).await;
        drop(stop_tx);
        res
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

async fn finish(stopped_rx: oneshot::Receiver<()>, join: JoinHandle<()>) -> Result<(), TaskError> {
    let acked = stopped_rx.await.is_ok();
    match join.await {
        Err(e) if e.is_panic() => {
            let msg = panic_message(e.into_panic());
            tracing::error!(error.kind = "task.panic", error.message = %msg);
            Err(TaskError::Panicked(msg))
        }
        _ if !acked => Err(TaskError::AckDropped),
        _ => Ok(()),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct AckOnDrop(Option<oneshot::Sender<()>>);

impl Drop for AckOnDrop {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// Relays the owner's stop request into the token the cycle watches.
async fn forward_stop(stop_rx: oneshot::Receiver<()>, cancel: CancellationToken) {
    tokio::select! {
        res = stop_rx => {
            if res.is_err() {
                tracing::debug!("task handle dropped, stopping");
            }
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}

async fn drive<C: Cycle>(
    interval: Duration,
    initial_delay: Option<Duration>,
    work: &mut C,
    cancel: &CancellationToken,
) {
    if let Some(delay) = initial_delay {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match work.run_cycle(cancel).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Done) => return,
            Err(e) => {
                tracing::error!(error.kind = "task.cycle", error.message = %e);
                return;
            }
        }
    }
}
