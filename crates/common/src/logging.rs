//! Logging setup and configuration
//!
//! Every line is written to stderr, prefixed by the span of the operation
//! that emitted it (for example `scan_all:scan_bus{bus="001"}`), so stdout
//! stays free for command output.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Timestamp, level, span context, target and message
    #[default]
    Full,
    /// Single-line abbreviated output
    Compact,
}

/// Build the level filter, letting `RUST_LOG` win over `default_level`
fn build_filter(default_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| Error::InvalidFilter {
            filter: default_level.to_string(),
            reason: e.to_string(),
        })
}

/// Setup tracing subscriber for the application
pub fn setup_logging(default_level: &str, format: LogFormat) -> Result<()> {
    let filter = build_filter(default_level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Full => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| Error::AlreadyInitialized(e.to_string()))
}
