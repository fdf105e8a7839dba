use clap::Parser;
use logtail_cli::app;
use logtail_cli::commands::cli;
use logtail_core::api as core_api;
use logtail_core::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let mut cfg = match args.config.as_deref() {
        Some(path) => {
            let mut cfg = core_api::load_from_path(std::path::Path::new(path))?;
            core_api::apply_env_overrides(&mut cfg);
            cfg
        }
        None => core_api::load_default()?,
    };
    if let Some(bin) = &args.docker_bin {
        cfg.docker.binary = bin.clone();
    }
    init_tracing(&cfg.logging).map_err(error::CliError::Command)?;

    match &args.command {
        cli::Commands::Follow(logs_args) => app::run_follow(&cfg, logs_args).await,
        cli::Commands::Logs(logs_args) => app::run_logs(&cfg, logs_args).await,
        cli::Commands::Ago(ago_args) => app::run_ago(&cfg, ago_args),
    }
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: stream / IO error
    // 30: process gone
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Stream(_) => 20,
        error::CliError::Inspect(ie) => match ie {
            error::InspectError::NotFound(_) => app::EXIT_PROCESS_GONE,
            error::InspectError::Failed { .. } => 20,
        },
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Task(_) => 50,
        error::CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &core_api::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("logtail"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("logtail.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    // Log output shares the terminal with container output, so it always goes to stderr.
    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
