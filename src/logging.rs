//! Log subscriber setup for binaries

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::client::config::LoggingSettings;
use crate::error::{Error, Result};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_logging(settings: &LoggingSettings, json_format: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| Error::Config(format!("invalid log filter {:?}: {e}", settings.level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_format || settings.json_format {
        registry
            .with(fmt::layer().json().with_file(false).with_line_number(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_file(false).with_line_number(false))
            .try_init()
    };
    result.map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    tracing::debug!(level = %settings.level, "logging initialized");
    Ok(())
}
