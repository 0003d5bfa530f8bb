//! Poll loop: wires the tracker client, scheduler, and UDS server together.
//! Runs as a tokio task, ticking the scheduler at a fixed cadence.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::interval;

use relwatch_core::types::TickOutcome;
use relwatch_daemon::notify::{DesktopNotifier, LogNotifier, NotificationSink};
use relwatch_daemon::scheduler::{PollScheduler, SchedulerConfig};
use relwatch_daemon::store::{JsonStateStore, StateStore};
use relwatch_source_filelist::{FilelistClient, ProfileScraper};

use crate::cli::{self, DaemonOpts};
use crate::server;

/// Documented tracker API budget; exceeding it risks throttling.
const API_HOURLY_BUDGET: usize = 150;

/// The production scheduler wiring.
pub type RuntimeScheduler =
    PollScheduler<FilelistClient, ProfileScraper, Box<dyn NotificationSink>, JsonStateStore>;

/// Shared daemon state protected by a mutex.
///
/// The mutex is the single-flight tick guard: the poll loop takes it with
/// `try_lock` (busy means this tick is a no-op), control-plane requests
/// queue on `lock`. At most one tick or full poll runs at a time.
pub struct DaemonState {
    pub scheduler: RuntimeScheduler,
}

/// Run the daemon: starts poll loop and UDS server, waits for shutdown signal.
pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let state_dir = opts.state_dir.clone().unwrap_or_else(cli::default_state_dir);
    let store = JsonStateStore::new(&state_dir);

    let base_url = opts.base_url.trim_end_matches('/').to_string();
    let timeout = Duration::from_secs(opts.http_timeout_secs.max(1));
    let search = FilelistClient::new(&base_url, timeout)?;
    let credentials = ProfileScraper::new(&base_url, opts.session_cookie.clone(), timeout)?;

    let sink: Box<dyn NotificationSink> = if opts.no_desktop_notify {
        Box::new(LogNotifier)
    } else {
        Box::new(DesktopNotifier::new(opts.notify_cmd.clone()))
    };

    let cfg = SchedulerConfig {
        cycle_ticks: opts.cycle_ticks.max(1),
        cycle_duration: chrono::Duration::minutes(opts.cycle_minutes.max(1)),
        ttl: chrono::Duration::days(opts.ttl_days.max(1)),
    };
    warn_if_over_budget(&store, &cfg, opts.tick_secs);

    tracing::info!(
        state_dir = %state_dir,
        base_url = %base_url,
        tick_secs = opts.tick_secs,
        cycle_ticks = cfg.cycle_ticks,
        "daemon configured"
    );

    let state = Arc::new(Mutex::new(DaemonState {
        scheduler: PollScheduler::new(search, credentials, sink, store, cfg),
    }));

    // Start UDS server
    let server_state = Arc::clone(&state);
    let server_socket = socket_path.to_string();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, server_state).await {
            tracing::error!("UDS server error: {e}");
        }
    });

    // Start poll loop
    let poll_state = Arc::clone(&state);
    let tick_secs = opts.tick_secs;
    let poll_handle = tokio::spawn(async move {
        run_poll_loop(poll_state, tick_secs).await;
    });

    // Wait for shutdown signal (ctrl-c or SIGTERM)
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };

    tokio::select! {
        () = shutdown => {}
        _ = poll_handle => {
            tracing::warn!("poll loop exited unexpectedly");
        }
        _ = server_handle => {
            tracing::warn!("server exited unexpectedly");
        }
    }

    // Cleanup socket
    let _ = std::fs::remove_file(socket_path);
    tracing::info!("daemon stopped");
    Ok(())
}

async fn run_poll_loop(state: Arc<Mutex<DaemonState>>, tick_secs: u64) {
    let mut ticker = interval(Duration::from_secs(tick_secs.max(1)));

    loop {
        ticker.tick().await;

        // Single-flight: a tick or full poll still in flight makes this
        // timer fire a no-op rather than queueing behind it.
        let Ok(mut st) = state.try_lock() else {
            tracing::debug!("previous tick still in flight, skipping");
            continue;
        };

        match st.scheduler.tick(Utc::now()).await {
            Ok(TickOutcome::Idle) => {}
            Ok(TickOutcome::NoCredentials) => {
                tracing::debug!("tick skipped: no credentials");
            }
            Ok(TickOutcome::EmptyWatchlist) => {
                tracing::debug!("tick skipped: empty watchlist");
            }
            Ok(TickOutcome::Completed {
                polled,
                fresh,
                cycle_completed,
            }) => {
                tracing::debug!(polled, fresh, cycle_completed, "tick complete");
            }
            Err(e) => tracing::error!("tick failed: {e}"),
        }
    }
}

/// Warn when the configured cadence would exceed the tracker API budget.
fn warn_if_over_budget(store: &JsonStateStore, cfg: &SchedulerConfig, tick_secs: u64) {
    let item_count = match store.load_items() {
        Ok(items) => items.len(),
        Err(_) => return,
    };
    if item_count == 0 {
        return;
    }
    let batch_size = item_count.div_ceil(cfg.cycle_ticks.max(1)).max(1);
    let ticks_per_hour = 3600 / tick_secs.max(1) as usize;
    let per_hour = batch_size * ticks_per_hour;
    if per_hour > API_HOURLY_BUDGET {
        tracing::warn!(
            requests_per_hour = per_hour,
            budget = API_HOURLY_BUDGET,
            "configured cadence exceeds tracker API budget; raise --tick-secs or --cycle-ticks"
        );
    }
}
