//! # Logging Setup
//!
//! Installs the `tracing` subscriber. Logs always go to stderr because stdout carries command
//! output (often JSON consumed by other agents). An optional file sink mirrors everything
//! without ANSI colours.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::LoggingConfig;
use crate::domain::paths;

const NOISY_DEPENDENCIES: &str = "hyper=warn,reqwest=warn,h2=warn,rustls=warn";

/// Default filter directive for the configured level.
pub fn filter_directive(level: &str, verbose: bool) -> String {
    let level = if verbose {
        "debug"
    } else if level.trim().is_empty() {
        "warn"
    } else {
        level.trim()
    };
    format!("{},{}", level, NOISY_DEPENDENCIES)
}

/// Splits the configured log file into (directory, file name), anchored at the config dir.
pub fn log_file_location(file: &str, config_path: &Path) -> Option<(PathBuf, String)> {
    let path = paths::resolve_config_relative(file, &paths::config_dir(config_path));
    let name = path.file_name()?.to_string_lossy().to_string();
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Some((dir, name))
}

/// Installs the global subscriber. Keep the returned guard alive so the file sink flushes.
pub fn init_logging(
    config: Option<&LoggingConfig>,
    config_path: Option<&Path>,
    verbose: bool,
) -> Option<WorkerGuard> {
    let level = config.map(|c| c.level.as_str()).unwrap_or("warn");
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbose)));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let mut guard = None;
    let file_layer = match (config.and_then(|c| c.file.as_deref()), config_path) {
        (Some(file), Some(config_path)) => match log_file_location(file, config_path) {
            Some((dir, name)) => match std::fs::create_dir_all(&dir) {
                Ok(()) => {
                    let appender = tracing_appender::rolling::never(dir, name);
                    let (non_blocking, worker) = tracing_appender::non_blocking(appender);
                    guard = Some(worker);
                    Some(
                        tracing_subscriber::fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                }
                Err(e) => {
                    eprintln!("warning: cannot create log directory {}: {}", dir.display(), e);
                    None
                }
            },
            None => None,
        },
        _ => None,
    };

    // `try_init` so tests (or a second call) do not panic on an installed subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}
