//! Logging setup.

use tracing_subscriber::EnvFilter;

use crate::error::{GameError, Result};

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (e.g. `"info"`, or a full
/// directive such as `"refugio_core=debug,info"`) is used. With `json`, events
/// are emitted as one JSON object per line.
///
/// # Errors
///
/// [`GameError::Telemetry`] for an invalid directive or when a subscriber is
/// already installed.
pub fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| GameError::Telemetry(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| GameError::Telemetry(e.to_string()))
}
