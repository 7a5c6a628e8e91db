//! For setting up logging.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// The filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_LEVEL: &str = "info";

/// Flushes logs upon being dropped.
#[derive(Debug)]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// Initializes logging.
///
/// Logs are written to stdout as JSON, one object per line.
pub fn init_logging() -> LogGuard {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());

    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_writer(non_blocking_stdout)
        .with_filter(EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(stdout)
        .with(ErrorLayer::default())
        .init();

    LogGuard {
        _guards: vec![stdout_guard],
    }
}
