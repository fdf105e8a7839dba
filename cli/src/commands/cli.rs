use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "logtail", version, about = "Follow container logs across restarts")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of the default lookup.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Container CLI binary (overrides `docker.binary`).
    #[arg(long, global = true)]
    pub docker_bin: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LogsArgs {
    /// Container id or name.
    pub container: String,

    /// Prefix every line with its timestamp.
    #[arg(long)]
    pub timestamps: bool,

    /// Only show logs newer than this: a duration (`90s`, `1h30m`), RFC3339 time, or Unix seconds.
    #[arg(long)]
    pub since: Option<String>,

    /// Number of lines to replay before following, or `all`.
    #[arg(long)]
    pub tail: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AgoArgs {
    /// Unix seconds or an RFC3339 timestamp.
    pub timestamp: String,

    /// Use long labels (`3 hours`) instead of short ones (`3h`).
    #[arg(long)]
    pub long: bool,

    /// Append " ago" (long labels only).
    #[arg(long)]
    pub ago: bool,

    /// Also print the absolute date.
    #[arg(long)]
    pub date: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Follow a container's logs, resuming when it restarts. Ctrl-C to stop.
    Follow(LogsArgs),
    /// Print a container's logs until Ctrl-C or until it exits.
    Logs(LogsArgs),
    /// Render how long ago a timestamp was.
    Ago(AgoArgs),
}
