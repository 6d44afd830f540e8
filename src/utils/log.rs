use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::Result;
use crate::io::{CsvEventLog, EventSink};

/// Installs the global tracing subscriber.
///
/// # Arguments
///
/// * `level` - Default filter directive (e.g. `info`, `stimulus_engine=debug`).
///   `RUST_LOG` takes precedence when set.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Opens the CSV event log named in the logging config, if any.
///
/// # Returns
///
/// * `Result<Option<Box<dyn EventSink>>>` - The sink, or `None` when no log
///   file is configured
pub fn event_log(config: &LoggingConfig) -> Result<Option<Box<dyn EventSink>>> {
    match &config.event_log {
        Some(path) => {
            let log = CsvEventLog::open(path)?;
            tracing::info!(path = %path, "Writing events to CSV");
            Ok(Some(Box::new(log)))
        }
        None => Ok(None),
    }
}
