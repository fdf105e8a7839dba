//! Stdout/stderr multiplexing over a single byte stream.
//!
//! Each frame is an 8-byte header `[channel, 0, 0, 0, len_be32]` followed by
//! `len` payload bytes. Channel 3 carries an error message from the daemon and
//! ends the stream.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder, FramedRead};
use tokio_util::sync::CancellationToken;

use crate::error::{FramingError, StreamError};

pub const HEADER_LEN: usize = 8;
/// Largest payload accepted in one frame (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const TAG_STDIN: u8 = 0;
const TAG_STDOUT: u8 = 1;
const TAG_STDERR: u8 = 2;
const TAG_SYSTEM_ERR: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stdin,
    Stdout,
    Stderr,
}

impl Channel {
    fn tag(self) -> u8 {
        match self {
            Channel::Stdin => TAG_STDIN,
            Channel::Stdout => TAG_STDOUT,
            Channel::Stderr => TAG_STDERR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub channel: Channel,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(channel: Channel, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MuxCodec;

impl Decoder for MuxCodec {
    type Item = Frame;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, StreamError> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        let tag = src[0];
        let channel = match tag {
            TAG_STDIN => Some(Channel::Stdin),
            TAG_STDOUT => Some(Channel::Stdout),
            TAG_STDERR => Some(Channel::Stderr),
            TAG_SYSTEM_ERR => None,
            other => return Err(FramingError::UnknownChannel(other).into()),
        };
        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FramingError::Oversized {
                len,
                max: MAX_FRAME_LEN,
            }
            .into());
        }
        let total = HEADER_LEN + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(len).freeze();
        match channel {
            Some(channel) => Ok(Some(Frame { channel, payload })),
            None => Err(FramingError::Remote(String::from_utf8_lossy(&payload).into_owned()).into()),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, StreamError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let expected = if buf.len() < HEADER_LEN {
            HEADER_LEN
        } else {
            HEADER_LEN + u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize
        };
        Err(FramingError::Truncated {
            buffered: buf.len(),
            expected,
        }
        .into())
    }
}

impl Encoder<Frame> for MuxCodec {
    type Error = std::io::Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = u32::try_from(frame.payload.len()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "frame payload too large")
        })?;
        dst.reserve(HEADER_LEN + frame.payload.len());
        dst.put_u8(frame.channel.tag());
        dst.put_slice(&[0, 0, 0]);
        dst.put_u32(len);
        dst.put_slice(&frame.payload);
        Ok(())
    }
}

/// Where each logical channel ends up.
pub trait ChannelSink {
    fn writer(&mut self, channel: Channel) -> &mut (dyn AsyncWrite + Send + Unpin);
}

/// Both channels go to one writer, in arrival order.
pub struct Merged<'a, W>(pub &'a mut W);

impl<W: AsyncWrite + Send + Unpin> ChannelSink for Merged<'_, W> {
    fn writer(&mut self, _channel: Channel) -> &mut (dyn AsyncWrite + Send + Unpin) {
        &mut *self.0
    }
}

/// Stdout (and stdin echoes) to one writer, stderr to another.
pub struct Split<'a, O, E> {
    pub stdout: &'a mut O,
    pub stderr: &'a mut E,
}

impl<O, E> ChannelSink for Split<'_, O, E>
where
    O: AsyncWrite + Send + Unpin,
    E: AsyncWrite + Send + Unpin,
{
    fn writer(&mut self, channel: Channel) -> &mut (dyn AsyncWrite + Send + Unpin) {
        match channel {
            Channel::Stdin | Channel::Stdout => &mut *self.stdout,
            Channel::Stderr => &mut *self.stderr,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyOutcome {
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    /// The copy stopped because the token fired, not because the source ended.
    pub cancelled: bool,
}

impl CopyOutcome {
    pub fn total_bytes(&self) -> u64 {
        self.stdout_bytes + self.stderr_bytes
    }
}

/// Copies framed input to `sink` until the source ends or `cancel` fires.
pub async fn demux_copy<R, S>(
    reader: R,
    sink: &mut S,
    cancel: &CancellationToken,
) -> Result<CopyOutcome, StreamError>
where
    R: AsyncRead + Unpin,
    S: ChannelSink + ?Sized,
{
    let mut frames = FramedRead::new(reader, MuxCodec);
    let mut outcome = CopyOutcome::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            next = frames.next() => next,
        };
        let Some(frame) = next.transpose()? else {
            break;
        };

        let wr = sink.writer(frame.channel);
        wr.write_all(&frame.payload)
            .await
            .map_err(StreamError::Write)?;
        wr.flush().await.map_err(StreamError::Write)?;

        match frame.channel {
            Channel::Stderr => outcome.stderr_bytes += frame.payload.len() as u64,
            Channel::Stdin | Channel::Stdout => outcome.stdout_bytes += frame.payload.len() as u64,
        }
    }

    Ok(outcome)
}

/// Copies an unframed (terminal) stream verbatim until it ends or `cancel` fires.
pub async fn raw_copy<R, W>(
    mut reader: R,
    writer: &mut W,
    cancel: &CancellationToken,
) -> Result<CopyOutcome, StreamError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; 16 * 1024];
    let mut outcome = CopyOutcome::default();

    loop {
        let n = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            res = reader.read(&mut buf) => res.map_err(StreamError::Read)?,
        };
        if n == 0 {
            break;
        }

        writer
            .write_all(&buf[..n])
            .await
            .map_err(StreamError::Write)?;
        writer.flush().await.map_err(StreamError::Write)?;
        outcome.stdout_bytes += n as u64;
    }

    Ok(outcome)
}
