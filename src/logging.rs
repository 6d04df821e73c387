use std::fs;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes the logging system with both console and file output.
///
/// Console output goes to stderr so stdout carries only the tool's report.
/// The returned guard must be held until exit so file logs are flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gym_maint=info"));
    let (subscriber, guard) = build_subscriber(config, filter);
    subscriber.init();

    if guard.is_none() {
        tracing::warn!(
            "Could not create log directory {}, logging to the console only",
            config.directory.display()
        );
    }
    guard
}

/// Console layer on stderr plus a daily rotated JSON file. The file layer
/// is left out when the log directory cannot be created.
fn build_subscriber(
    config: &LoggingConfig,
    filter: EnvFilter,
) -> (impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>) {
    let (file_layer, guard) = match fs::create_dir_all(&config.directory) {
        Ok(()) => {
            let file_appender =
                tracing_appender::rolling::daily(&config.directory, &config.file_name);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        Err(_) => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr));
    (subscriber, guard)
}
