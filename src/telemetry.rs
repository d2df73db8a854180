//! Logging setup.
//!
//! The subscriber is installed once at startup; every component afterwards
//! only emits `tracing` events.

use tracing_subscriber::EnvFilter;

use crate::error::ForwardError;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Install the global `tracing` subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init(show_time: bool) -> Result<(), ForwardError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if show_time {
        builder.try_init()
    } else {
        builder.without_time().try_init()
    };

    result.map_err(|e| ForwardError::Config(format!("failed to initialize logging: {}", e)))
}
