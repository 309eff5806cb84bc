use crate::config::AppConfig;
use tracing_appender::rolling;

/// Initializes the global tracing subscriber with a daily-rolling file layer
/// and an optional stdout layer.
///
/// The returned guard must be kept alive for the lifetime of the process or
/// buffered log lines are dropped on exit.
pub fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use std::fs;
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    fs::create_dir_all("logs").ok();

    let cfg = AppConfig::global();

    let file_appender = rolling::daily("logs", &cfg.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_target(true)
        .with_thread_ids(true);

    let env_filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if cfg.log_to_stdout {
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}
