// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

/// Sets up the logging framework using tracing_subscriber.
/// Reads log level filters from the `RUST_LOG` environment variable.
/// Defaults to "info" if `RUST_LOG` is not set.
///
/// Logs go to stderr so that the JSON dump printed after a run stays clean
/// on stdout.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Logging setup complete.");
}
