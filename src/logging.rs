use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Routes `tracing` output to a daily rolling file in the configured
/// directory.
///
/// Stdout belongs to the TUI, so nothing is written there. The returned
/// guard flushes pending lines when dropped and must outlive the app.
pub fn initialize_logging(config: &LoggingConfig) -> WorkerGuard {
    let _ = std::fs::create_dir_all(&config.directory);

    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directives = filter_directives(&config.level, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(
        "Logging to {}/{} at {}",
        config.directory,
        config.file_name,
        directives
    );
    guard
}

/// `RUST_LOG` wins over the configured level when it is set and non-empty.
pub fn filter_directives(level: &str, env: Option<String>) -> String {
    match env.map(|v| v.trim().to_string()) {
        Some(env) if !env.is_empty() => env,
        _ => level.trim().to_string(),
    }
}
