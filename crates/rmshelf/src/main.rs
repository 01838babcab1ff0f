//! `rmshelf` - reMarkable article organizer daemon
//!
//! Files articles sent to the tablet into To Read, moves them to Read once
//! they look read, and optionally archives them later.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rmshelf_core::{Config, Organizer, StateRepository, XochitlStore};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Directory under the home directory for configuration, state and logs.
const APP_DIR_NAME: &str = ".rmshelf";

/// Default state file name inside the application directory.
const STATE_FILE_NAME: &str = "reading_state.json";

/// reMarkable article organizer.
#[derive(Debug, Parser)]
#[command(name = "rmshelf", version, about)]
struct Cli {
    /// Path to the configuration file (created with defaults if missing).
    #[arg(long, env = "RMSHELF_CONFIG")]
    config: Option<PathBuf>,

    /// Override the document store directory.
    #[arg(long)]
    documents: Option<PathBuf>,

    /// Override the state file.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Directory for `organizer.log`.
    #[arg(long, env = "RMSHELF_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Run a single cycle and exit (the default).
    #[arg(long, conflicts_with = "daemon")]
    once: bool,

    /// Keep running, one cycle every poll interval, until stopped.
    #[arg(long)]
    daemon: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let app_dir = app_dir();

    let log_dir = cli.log_dir.clone().unwrap_or_else(|| app_dir.clone());
    let _log_guard = logging::init(&log_dir, cli.verbose);

    match run(cli, &app_dir).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, app_dir: &Path) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(|| app_dir.join("config.json"));
    let mut config = Config::load_or_create(&config_path)
        .await
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    if let Some(documents) = cli.documents {
        config.documents_path = documents;
    }
    if let Some(state) = cli.state {
        config.state_file = Some(state);
    }
    let config = config.validated()?;

    let state_path = config
        .state_file
        .clone()
        .unwrap_or_else(|| app_dir.join(STATE_FILE_NAME));
    let states = StateRepository::open(&state_path, config.io_timeout())
        .await
        .with_context(|| format!("Failed to open state file {}", state_path.display()))?;

    let store =
        XochitlStore::new(config.documents_path.clone()).with_io_timeout(config.io_timeout());

    info!(
        documents = %store.root().display(),
        state = %states.path().unwrap_or(state_path.as_path()).display(),
        tracked = states.len(),
        "Starting rmshelf"
    );

    let daemon = cli.daemon && !cli.once;
    let mut organizer = Organizer::new(config, store, states);

    if daemon {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            wait_for_shutdown_signal().await;
            info!("Shutdown requested; stopping after the current cycle");
            let _ = shutdown_tx.send(true);
        });
        organizer
            .run_continuous(shutdown_rx)
            .await
            .context("Organizer stopped on a fatal error")?;
    } else {
        let report = organizer.run_once().await.context("Organizer cycle failed")?;
        info!(
            candidates = report.candidates,
            moved = report.moved(),
            failed = report.failed_moves,
            "Single pass complete"
        );
    }

    Ok(())
}

/// `~/.rmshelf`, or `./.rmshelf` when there is no home directory.
fn app_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(APP_DIR_NAME), |home| home.join(APP_DIR_NAME))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {e}"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
