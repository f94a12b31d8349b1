//! Logging setup
//!
//! The library only emits `tracing` events; applications call
//! `init_logging` once to install a subscriber.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogSettings};
use crate::error::{RepoError, RepoResult};

/// Install a global `fmt` subscriber
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(settings: &LogSettings) -> RepoResult<()> {
    let env_filter = EnvFilter::try_new(&settings.filter)
        .map_err(|e| RepoError::Config(format!("Invalid log filter '{}': {}", settings.filter, e)))?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);

    let result = match settings.format {
        LogFormat::Pretty => subscriber.pretty().try_init(),
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
    result.map_err(|e| RepoError::Config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(format = ?settings.format, filter = %settings.filter, "logging initialized");
    Ok(())
}
