use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

pub const LOG_FILE: &str = "banknote-explorer.log";

/// Send `tracing` output to `<log_dir>/banknote-explorer.log`.
///
/// The terminal belongs to the TUI, so there is no stdout layer. `RUST_LOG`
/// overrides `default_filter`. Keep the returned guard alive until exit or
/// buffered lines are lost.
pub fn init(log_dir: &Path, default_filter: &str) -> Option<WorkerGuard> {
    if std::fs::create_dir_all(log_dir).is_err() {
        eprintln!("Failed to create log directory {}", log_dir.display());
        return None;
    }

    // Separate sessions in the append-only log
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))
    {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(file, "\n=== Session started at {} ===", timestamp);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        return None;
    }

    Some(guard)
}
