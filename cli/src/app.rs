//! Command handlers: merge flag overrides into the config, wire up the docker
//! collaborators, and run one of the two display modes.
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use chrono::DateTime;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use logtail_core::api as core_api;
use logtail_core::api::{
    AppConfig, ClearScreen, CliError, CopyOutcome, LabelLength, LogView, LogsConfig, ProcessHandle,
    StreamError, TailEvent, TerminateReason, TimeAgoParams,
};
use logtail_plugins::factory;

use crate::commands::cli::{AgoArgs, LogsArgs};

pub const EXIT_PROCESS_GONE: i32 = 30;

const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn logs_config(cfg: &AppConfig, args: &LogsArgs) -> LogsConfig {
    let mut logs = cfg.logs.clone();
    if args.timestamps {
        logs.timestamps = true;
    }
    if let Some(since) = &args.since {
        logs.since = since.clone();
    }
    if let Some(tail) = &args.tail {
        logs.tail = tail.clone();
    }
    logs
}

/// Pane mode: follow the container across restarts until Ctrl-C or until it is removed.
#[tracing::instrument(name = "cli.follow", skip(cfg, args), fields(container = %args.container))]
pub async fn run_follow(cfg: &AppConfig, args: &LogsArgs) -> Result<i32, CliError> {
    let options = logs_config(cfg, args).stream_options()?;
    let source = factory::build_source(&cfg.docker).context("building log source")?;
    let inspector = factory::build_inspector(&cfg.docker).context("building inspector")?;

    let state = inspector.inspect(&args.container).await?;
    let process = ProcessHandle::new(args.container.clone()).with_snapshot(state);
    if !state.running {
        tracing::info!("container is not running, waiting for it to start");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut view =
        LogView::new(tokio::io::stdout(), source, inspector, &cfg.tailer).with_events(tx);
    if atty::is(atty::Stream::Stdout) {
        // A restart replays the since/tail window; start each session on a clean screen.
        view = view.with_session_reset(Arc::new(ClearScreen));
    }
    view.show(process, options).await;

    let gone = tokio::select! {
        _ = interrupted() => None,
        reason = next_termination(&mut rx) => reason,
    };
    view.stop().await?;

    match gone {
        Some(reason) => {
            eprintln!("stopped following {}: {reason}", args.container);
            Ok(EXIT_PROCESS_GONE)
        }
        None => Ok(0),
    }
}

/// Standalone mode: stream once to the terminal, then wait for the user.
#[tracing::instrument(name = "cli.logs", skip(cfg, args), fields(container = %args.container))]
pub async fn run_logs(cfg: &AppConfig, args: &LogsArgs) -> Result<i32, CliError> {
    let options = logs_config(cfg, args).stream_options()?;
    let source = factory::build_source(&cfg.docker).context("building log source")?;
    let inspector = factory::build_inspector(&cfg.docker).context("building inspector")?;

    let state = inspector.inspect(&args.container).await?;
    let process = ProcessHandle::new(args.container.clone()).with_snapshot(state);

    let mut out = tokio::io::stdout();
    let result = core_api::stream_until_interrupted(
        source.as_ref(),
        &process,
        &options,
        &mut out,
        interrupted(),
    )
    .await;
    out.flush().await?;

    let prompt = (!cfg.gui.return_immediately && atty::is(atty::Stream::Stdin))
        .then(|| prompt_to_return(tokio::io::stdin(), tokio::io::stdout(), interrupted()));
    finish_logs(result, prompt).await
}

/// Reports how the standalone stream ended; only a clean end waits on `prompt`.
async fn finish_logs<P>(
    result: Result<CopyOutcome, StreamError>,
    prompt: Option<P>,
) -> Result<i32, CliError>
where
    P: Future<Output = Result<(), CliError>>,
{
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error.kind = "stream", error.message = %e, "log stream failed");
            return Err(e.into());
        }
    };
    tracing::debug!(
        bytes = outcome.total_bytes(),
        cancelled = outcome.cancelled,
        "log stream finished"
    );

    if let Some(prompt) = prompt {
        prompt.await?;
    }
    Ok(0)
}

pub fn run_ago(cfg: &AppConfig, args: &AgoArgs) -> Result<i32, CliError> {
    let params = ago_params(cfg, args)?;
    let label = core_api::to_time_ago(&params);
    if args.date {
        let date = match &params.timestamp {
            Some(ts) => core_api::rfc3339_to_rfc1123(ts)
                .map_err(|e| CliError::Command(format!("invalid timestamp {ts}: {e}")))?,
            None => core_api::unix_to_date(params.unix_timestamp, DATE_FORMAT),
        };
        println!("{label}\t{date}");
    } else {
        println!("{label}");
    }
    Ok(0)
}

pub fn ago_params(cfg: &AppConfig, args: &AgoArgs) -> Result<TimeAgoParams, CliError> {
    let raw = args.timestamp.trim();
    let label_length = if args.long {
        LabelLength::Long
    } else {
        cfg.gui.time_ago.label_length
    };
    let include_ago = args.ago || cfg.gui.time_ago.include_ago;

    if let Ok(unix) = raw.parse::<i64>() {
        return Ok(TimeAgoParams {
            unix_timestamp: unix,
            timestamp: None,
            label_length,
            include_ago,
        });
    }
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| CliError::Command(format!("invalid timestamp {raw}: {e}")))?;
    Ok(TimeAgoParams {
        unix_timestamp: 0,
        timestamp: Some(raw.to_string()),
        label_length,
        include_ago,
    })
}

/// Drains lifecycle events until the tailer ends; returns why, if the process went away.
async fn next_termination(rx: &mut mpsc::UnboundedReceiver<TailEvent>) -> Option<String> {
    while let Some(event) = rx.recv().await {
        match event {
            TailEvent::SessionStarted { process, attempt } => {
                tracing::debug!(process = %process, attempt, "log session started");
            }
            TailEvent::SessionEnded {
                process,
                attempt,
                bytes,
                error,
                ..
            } => {
                tracing::debug!(process = %process, attempt, bytes, error = ?error, "log session ended");
            }
            TailEvent::Polling { process } => {
                tracing::info!(process = %process, "container stopped, waiting for restart");
            }
            TailEvent::Resumed { process } => {
                tracing::info!(process = %process, "container restarted");
            }
            TailEvent::Terminated { reason, .. } => {
                return match reason {
                    TerminateReason::ProcessGone(reason) => Some(reason),
                    TerminateReason::Cancelled => None,
                };
            }
        }
    }
    None
}

fn interrupted() -> impl Future<Output = ()> + Send + 'static {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// Waits for a line on `input`, or for `interrupt`, whichever comes first.
async fn prompt_to_return<R, W, F>(input: R, mut out: W, interrupt: F) -> Result<(), CliError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    out.write_all(b"\n\npress enter to return\n").await?;
    out.flush().await?;

    let mut line = String::new();
    let mut input = BufReader::new(input);
    tokio::select! {
        read = input.read_line(&mut line) => {
            read?;
        }
        _ = interrupt => {}
    }
    Ok(())
}
