//! Logging system initialization
//!
//! Sets up the tracing subscriber from the loaded configuration: level filter,
//! optional file output through a non-blocking appender, json or plain format.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the logging system.
///
/// Call exactly once during startup, after configuration is loaded. The
/// returned `WorkerGuard` must be kept alive for the duration of the program
/// so buffered log lines are flushed on exit.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let writer: Box<dyn std::io::Write + Send + Sync> = match &config.file {
        Some(log_file) if !log_file.is_empty() => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .expect("Failed to open log file");
            Box::new(file)
        }
        _ => Box::new(std::io::stdout()),
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = EnvFilter::new(config.level.clone());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(config.file.as_ref().is_none_or(|f| f.is_empty()));

    if config.format == "json" {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }

    guard
}
