//! Logging setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Name of the log file inside the log directory.
pub const LOG_FILE_NAME: &str = "organizer.log";

/// Install the global subscriber: stderr plus `organizer.log` in `log_dir`.
///
/// `RUST_LOG` overrides the default filter. If the log directory cannot be
/// created, logging continues on stderr only. The returned guard flushes the
/// file writer on drop and must be kept alive.
pub fn init(log_dir: &Path, verbose: bool) -> Option<WorkerGuard> {
    let default_filter = if verbose {
        "rmshelf=debug,rmshelf_core=debug"
    } else {
        "rmshelf=info,rmshelf_core=info"
    };
    let env_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let mut guard = None;
    let file_layer = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(env_filter()),
            )
        }
        Err(err) => {
            eprintln!(
                "Warning: failed to create log directory {}: {err}",
                log_dir.display()
            );
            None
        }
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
