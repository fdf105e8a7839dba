use tokio::sync::mpsc;

/// Progress of a log view, reported as it moves between streaming and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    SessionStarted {
        process: String,
        attempt: u64,
    },
    SessionEnded {
        process: String,
        attempt: u64,
        bytes: u64,
        cancelled: bool,
        error: Option<String>,
    },
    Polling {
        process: String,
    },
    Resumed {
        process: String,
    },
    Terminated {
        process: String,
        reason: TerminateReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateReason {
    Cancelled,
    ProcessGone(String),
}

pub type TailEventTx = mpsc::UnboundedSender<TailEvent>;

pub(crate) fn emit(tx: Option<&TailEventTx>, event: TailEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}
