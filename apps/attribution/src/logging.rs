//! Logging initialization for the attribution service

use std::fs;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the non-blocking file writer flushing until dropped.
pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Output goes to stdout as JSON or
/// human-readable text, and optionally to a rotating file.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LogGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dpc_attribution={},tower_http=info,sqlx=warn",
            config.level
        ))
    });

    let (file_writer, file_guard) = if config.file_enabled {
        fs::create_dir_all(&config.file_directory)?;
        let appender = match config.file_rotation.as_str() {
            "hourly" => tracing_appender::rolling::hourly(&config.file_directory, &config.file_prefix),
            "minutely" => {
                tracing_appender::rolling::minutely(&config.file_directory, &config.file_prefix)
            }
            "never" => tracing_appender::rolling::never(
                &config.file_directory,
                format!("{}.log", config.file_prefix),
            ),
            _ => tracing_appender::rolling::daily(&config.file_directory, &config.file_prefix),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .with(file_writer.map(|w| fmt::layer().json().with_writer(w)))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()?;
    }

    tracing::info!(level = %config.level, json = config.json, "Logging initialized");

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
