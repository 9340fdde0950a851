//! Logging setup
//!
//! Console output always; a non-blocking file writer in the app data
//! directory when `log_to_file` is set. `RUST_LOG` overrides the configured
//! filter.

use crate::config::{ensure_app_data_dir, LoggingSettings};
use crate::error::{DirVisError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and closes the log file.
pub fn init(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.filter));

    let (file_layer, guard) = if settings.log_to_file {
        let dir = ensure_app_data_dir()?;
        let appender = tracing_appender::rolling::never(&dir, &settings.file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| DirVisError::Config(format!("Failed to install logger: {}", e)))?;

    if let Some(dir) = guard.as_ref().and(crate::config::app_data_dir()) {
        tracing::info!("Logging to {}", dir.join(&settings.file_name).display());
    }
    Ok(guard)
}
