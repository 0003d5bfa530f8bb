//! CLI definition using clap derive.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "relwatch", about = "private-tracker release watcher")]
pub struct Cli {
    /// UDS socket path (default: /tmp/relwatch-$USER/relwatchd.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon (poll loop + UDS server)
    Daemon(DaemonOpts),
    /// Show the watchlist with match markers
    Ls,
    /// Add an item to the watchlist
    Add {
        name: String,
        /// Season packs only: skip episode-level releases
        #[arg(long)]
        strict: bool,
    },
    /// Remove an item (also drops its seen history)
    Rm { name: String },
    /// Rename an item (seen history starts over)
    Rename { old: String, new: String },
    /// Set an item's strict mode
    Strict { name: String, mode: OnOff },
    /// Store tracker credentials
    Creds { username: String, passkey: String },
    /// Poll the whole watchlist now
    Poll,
    /// Show daemon status summary
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnOff {
    On,
    Off,
}

impl OnOff {
    pub fn as_bool(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Tick interval in seconds
    #[arg(long, default_value = "60")]
    pub tick_secs: u64,

    /// Ticks that cover one full watchlist cycle
    #[arg(long, default_value = "60")]
    pub cycle_ticks: usize,

    /// Wall-clock minutes one full cycle takes
    #[arg(long, default_value = "60")]
    pub cycle_minutes: i64,

    /// Days without a fresh release before an item is retired
    #[arg(long, default_value = "30")]
    pub ttl_days: i64,

    /// State directory (default: $XDG_STATE_HOME/relwatch)
    #[arg(long)]
    pub state_dir: Option<String>,

    /// Tracker base URL
    #[arg(long, default_value = "https://filelist.io")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value = "30")]
    pub http_timeout_secs: u64,

    /// Session cookie for profile-page credential discovery
    #[arg(long, env = "RELWATCH_SESSION_COOKIE")]
    pub session_cookie: Option<String>,

    /// Command spawned per desktop notification
    #[arg(long, default_value = "notify-send")]
    pub notify_cmd: String,

    /// Log notifications instead of spawning the notifier command
    #[arg(long)]
    pub no_desktop_notify: bool,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/relwatch/relwatchd.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/relwatch-{user}/relwatchd.sock")
}

/// Default state directory under XDG state or the home directory.
pub fn default_state_dir() -> String {
    if let Ok(dir) = std::env::var("XDG_STATE_HOME") {
        return format!("{dir}/relwatch");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.local/state/relwatch")
}
