#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Instant;
use tokio_util::codec::Encoder;

use logtail_core::api::{
    Channel, Frame, InspectError, LogSource, LogStream, MuxCodec, ProcessInspector, ProcessState,
    StreamError, StreamOptions,
};

pub fn framed(frames: &[(Channel, &str)]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    for (ch, payload) in frames {
        MuxCodec
            .encode(Frame::new(*ch, payload.as_bytes().to_vec()), &mut buf)
            .unwrap();
    }
    buf.to_vec()
}

/// How a scripted session behaves once its bytes are consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum After {
    /// Source reports end of stream (process exited).
    End,
    /// Keep the subscription open with no more output.
    Hang,
    /// Fail the next read.
    Fail,
}

#[derive(Clone, Debug)]
pub enum Script {
    Session {
        bytes: Vec<u8>,
        after: After,
        /// Terminal mode the stream reports for itself, if any.
        raw: Option<bool>,
    },
    OpenError(String),
}

impl Script {
    pub fn framed(frames: &[(Channel, &str)], after: After) -> Self {
        Script::Session {
            bytes: framed(frames),
            after,
            raw: None,
        }
    }

    pub fn raw(bytes: &[u8], after: After) -> Self {
        Script::Session {
            bytes: bytes.to_vec(),
            after,
            raw: None,
        }
    }

    /// Unframed bytes from a stream that reports itself as a terminal.
    pub fn terminal(bytes: &[u8], after: After) -> Self {
        Script::Session {
            bytes: bytes.to_vec(),
            after,
            raw: Some(true),
        }
    }
}

#[derive(Default)]
pub struct SourceStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
}

impl SourceStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

/// A log source that plays back one script per `open`, per process id.
pub struct ScriptedSource {
    scripts: Mutex<Vec<(String, VecDeque<Script>)>>,
    pub stats: Arc<SourceStats>,
    pub options_seen: Mutex<Vec<StreamOptions>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            stats: Arc::new(SourceStats::default()),
            options_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, process: &str, scripts: Vec<Script>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((process.to_string(), scripts.into()));
        self
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(
        &self,
        process_id: &str,
        options: &StreamOptions,
    ) -> Result<Box<dyn LogStream>, StreamError> {
        self.options_seen.lock().unwrap().push(options.clone());
        let next = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts
                .iter_mut()
                .find(|(id, _)| id == process_id)
                .and_then(|(_, q)| q.pop_front())
        };
        match next {
            Some(Script::Session { bytes, after, raw }) => {
                self.stats.opened.fetch_add(1, Ordering::SeqCst);
                let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.stats.max_live.fetch_max(live, Ordering::SeqCst);
                Ok(Box::new(ScriptedStream {
                    data: Cursor::new(bytes),
                    after,
                    raw,
                    stats: Arc::clone(&self.stats),
                    closed: false,
                }))
            }
            Some(Script::OpenError(reason)) => Err(StreamError::Open {
                process: process_id.to_string(),
                reason,
            }),
            None => Err(StreamError::Open {
                process: process_id.to_string(),
                reason: "no more scripted sessions".into(),
            }),
        }
    }
}

pub struct ScriptedStream {
    data: Cursor<Vec<u8>>,
    after: After,
    raw: Option<bool>,
    stats: Arc<SourceStats>,
    closed: bool,
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let remaining = self.data.get_ref().len() as u64 - self.data.position();
        if remaining > 0 {
            return Pin::new(&mut self.data).poll_read(cx, buf);
        }
        match self.after {
            After::End => Poll::Ready(Ok(())),
            After::Hang => Poll::Pending,
            After::Fail => Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "transport reset",
            ))),
        }
    }
}

#[async_trait]
impl LogStream for ScriptedStream {
    async fn close(&mut self) -> std::io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn raw_terminal(&self) -> Option<bool> {
        self.raw
    }
}

/// Lifecycle of the fake process as seen by the inspector.
#[derive(Clone, Copy, Debug)]
pub enum Lifecycle {
    Running,
    Stopped,
    /// Stopped until the given instant, running afterwards.
    ResumesAt(Instant),
    Removed,
}

pub struct FakeInspector {
    lifecycle: Mutex<Lifecycle>,
    tty: bool,
    pub calls: AtomicUsize,
}

impl FakeInspector {
    pub fn new(lifecycle: Lifecycle) -> Self {
        Self {
            lifecycle: Mutex::new(lifecycle),
            tty: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, lifecycle: Lifecycle) {
        *self.lifecycle.lock().unwrap() = lifecycle;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessInspector for FakeInspector {
    async fn inspect(&self, process_id: &str) -> Result<ProcessState, InspectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lifecycle = *self.lifecycle.lock().unwrap();
        let running = match lifecycle {
            Lifecycle::Running => true,
            Lifecycle::Stopped => false,
            Lifecycle::ResumesAt(at) => Instant::now() >= at,
            Lifecycle::Removed => return Err(InspectError::NotFound(process_id.to_string())),
        };
        Ok(ProcessState {
            running,
            tty: self.tty,
        })
    }
}
