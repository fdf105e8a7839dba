use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;

use logtail_core::api::{
    Channel, Frame, LogSource, LogStream, MuxCodec, ProcessInspector, StreamError, StreamOptions,
};

use super::inspect::DockerInspector;

const CHUNK: usize = 16 * 1024;
const PIPE_CAPACITY: usize = 64 * 1024;

/// Follows container logs by running `docker logs`.
///
/// The CLI splits a container's output into its own stdout and stderr pipes;
/// those are framed back into the multiplexed format so the streamer sees the
/// same bytes a daemon connection would deliver. TTY containers are passed
/// through untouched.
#[derive(Debug, Clone)]
pub struct DockerLogSource {
    binary: String,
    inspector: DockerInspector,
}

impl DockerLogSource {
    pub fn new(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        Self {
            inspector: DockerInspector::new(binary.clone()),
            binary,
        }
    }
}

pub(crate) fn logs_args(process_id: &str, options: &StreamOptions) -> Vec<String> {
    let mut args = vec!["logs".to_string()];
    if options.follow {
        args.push("--follow".to_string());
    }
    if options.include_timestamps {
        args.push("--timestamps".to_string());
    }
    if let Some(since) = options.since.to_arg() {
        args.push("--since".to_string());
        args.push(since);
    }
    args.push("--tail".to_string());
    args.push(options.tail.to_string());
    args.push(process_id.to_string());
    args
}

#[async_trait]
impl LogSource for DockerLogSource {
    fn name(&self) -> &str {
        "docker"
    }

    async fn open(
        &self,
        process_id: &str,
        options: &StreamOptions,
    ) -> Result<Box<dyn LogStream>, StreamError> {
        let open_err = |reason: String| StreamError::Open {
            process: process_id.to_string(),
            reason,
        };

        let state = self
            .inspector
            .inspect(process_id)
            .await
            .map_err(|e| open_err(e.to_string()))?;

        let mut child = Command::new(&self.binary)
            .args(logs_args(process_id, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| open_err(format!("failed to run {}: {e}", self.binary)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| open_err("docker logs stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| open_err("docker logs stderr not captured".into()))?;

        tracing::debug!(process = process_id, tty = state.tty, "docker logs started");

        if state.tty {
            // A TTY container has a single merged stream; stderr only carries CLI errors.
            let pump = tokio::spawn(drain_cli_errors(process_id.to_string(), stderr));
            return Ok(Box::new(DockerLogStream {
                reader: Box::new(stdout),
                tty: true,
                child,
                pump: Some(pump),
            }));
        }

        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let pump = tokio::spawn(pump_frames(stdout, stderr, writer));
        Ok(Box::new(DockerLogStream {
            reader: Box::new(reader),
            tty: false,
            child,
            pump: Some(pump),
        }))
    }
}

/// Interleaves two pipes into mux frames, in the order the reads complete.
pub(crate) async fn pump_frames<O, E, W>(mut stdout: O, mut stderr: E, out: W) -> std::io::Result<u64>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(out, MuxCodec);
    let mut out_buf = vec![0u8; CHUNK];
    let mut err_buf = vec![0u8; CHUNK];
    let mut out_open = true;
    let mut err_open = true;
    let mut total = 0u64;

    while out_open || err_open {
        tokio::select! {
            n = stdout.read(&mut out_buf), if out_open => {
                let n = n?;
                if n == 0 {
                    out_open = false;
                } else {
                    framed.send(Frame::new(Channel::Stdout, out_buf[..n].to_vec())).await?;
                    total += n as u64;
                }
            }
            n = stderr.read(&mut err_buf), if err_open => {
                let n = n?;
                if n == 0 {
                    err_open = false;
                } else {
                    framed.send(Frame::new(Channel::Stderr, err_buf[..n].to_vec())).await?;
                    total += n as u64;
                }
            }
        }
    }

    framed.close().await?;
    Ok(total)
}

async fn drain_cli_errors<E>(process: String, mut stderr: E) -> std::io::Result<u64>
where
    E: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let n = stderr.read_to_end(&mut buf).await?;
    if n > 0 {
        tracing::warn!(
            process = %process,
            message = %String::from_utf8_lossy(&buf).trim(),
            "docker logs reported an error"
        );
    }
    Ok(n as u64)
}

/// A running `docker logs` child. Closing (or dropping) it kills the child.
pub struct DockerLogStream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    tty: bool,
    child: Child,
    pump: Option<JoinHandle<std::io::Result<u64>>>,
}

impl AsyncRead for DockerLogStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

#[async_trait]
impl LogStream for DockerLogStream {
    async fn close(&mut self) -> std::io::Result<()> {
        // Drop the read side first: a pump blocked on a full pipe then fails
        // its write instead of waiting for a reader that is gone.
        self.reader = Box::new(tokio::io::empty());
        if let Err(e) = self.child.start_kill() {
            // Already exited and reaped.
            tracing::trace!(error = %e, "docker logs child not killed");
        }
        let status = self.child.wait().await?;
        tracing::debug!(status = %status, "docker logs exited");

        if let Some(pump) = self.pump.take() {
            match pump.await {
                Ok(Ok(bytes)) => tracing::trace!(bytes, "log pump finished"),
                Ok(Err(e)) => tracing::debug!(error = %e, "log pump ended with error"),
                Err(e) => tracing::debug!(error = %e, "log pump task failed"),
            }
        }
        Ok(())
    }

    fn raw_terminal(&self) -> Option<bool> {
        Some(self.tty)
    }
}

impl Drop for DockerLogStream {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtail_core::api::{Since, Tail};
    use logtail_core::stream::{demux_copy, Split};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn args_follow_with_all_options() {
        let options = StreamOptions {
            include_timestamps: true,
            since: Since::Relative(Duration::from_secs(3600)),
            tail: Tail::Lines(20),
            follow: true,
        };
        assert_eq!(
            logs_args("web", &options),
            vec![
                "logs",
                "--follow",
                "--timestamps",
                "--since",
                "3600s",
                "--tail",
                "20",
                "web"
            ]
        );
    }

    #[test]
    fn args_minimal() {
        let options = StreamOptions {
            follow: false,
            ..StreamOptions::default()
        };
        assert_eq!(logs_args("db", &options), vec!["logs", "--tail", "all", "db"]);
    }

    #[tokio::test]
    async fn pump_frames_keeps_channels_apart() {
        let (writer, reader) = tokio::io::duplex(1024);
        let total = pump_frames(&b"out line\n"[..], &b"err line\n"[..], writer)
            .await
            .unwrap();
        assert_eq!(total, 18);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let outcome = demux_copy(
            reader,
            &mut Split {
                stdout: &mut stdout,
                stderr: &mut stderr,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(stdout, b"out line\n");
        assert_eq!(stderr, b"err line\n");
    }

    #[tokio::test]
    async fn pump_frames_closes_output_when_both_pipes_end() {
        let (writer, mut reader) = tokio::io::duplex(64);
        let total = pump_frames(tokio::io::empty(), tokio::io::empty(), writer)
            .await
            .unwrap();
        assert_eq!(total, 0);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    /// Writes a stand-in `docker` that answers `inspect` and runs `logs_cmd` for `logs`.
    #[cfg(unix)]
    fn fake_docker(dir: &std::path::Path, tty: bool, logs_cmd: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("docker");
        let script = format!(
            "#!/bin/sh\ncase \"$1\" in\n  inspect) echo '[{{\"State\":{{\"Running\":true}},\"Config\":{{\"Tty\":{tty}}}}}]' ;;\n  logs) {logs_cmd} ;;\nesac\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn close_returns_with_unread_backlog() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_docker(
            dir.path(),
            false,
            "head -c 1000000 /dev/zero; exec sleep 30",
        );
        let source = DockerLogSource::new(binary);

        let mut stream = source
            .open("web", &StreamOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.raw_terminal(), Some(false));
        let mut head = [0u8; 100];
        stream.read_exact(&mut head).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), stream.close())
            .await
            .expect("close stalled behind the pump")
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tty_container_is_copied_raw_without_a_snapshot() {
        use logtail_core::api::{stream_logs, ProcessHandle};

        let dir = tempfile::tempdir().unwrap();
        // Starts like a stdout frame header; must not be demultiplexed.
        let binary = fake_docker(
            dir.path(),
            true,
            r"printf '\001\000\000\000\000\000\000\002hi\r\n'",
        );
        let source = DockerLogSource::new(binary);

        let mut sink = Vec::new();
        let outcome = stream_logs(
            &source,
            &ProcessHandle::new("web"),
            &StreamOptions::default(),
            &mut sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(sink, b"\x01\x00\x00\x00\x00\x00\x00\x02hi\r\n");
    }
}
