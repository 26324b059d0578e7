#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Logging utilities shared by the Steward crates.
//!
//! Events go through `tracing`; binaries call [`init`] once to install a
//! formatting subscriber at the configured level.

use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use tracing::Level;

/// Errors raised while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured level is not one of trace, debug, info, warn, error.
    #[error("Unknown log level '{0}'. Expected one of: trace, debug, info, warn, error")]
    UnknownLevel(String),
    /// A global subscriber was already installed.
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
    /// The log file could not be opened for appending.
    #[error("Failed to open log file: {0}")]
    File(#[from] std::io::Error),
}

/// Emits a trace event tagged with the originating module.
pub fn trace(module: &str, msg: &str) {
    tracing::trace!(module, "{}", msg);
}

/// Parses a case-insensitive level name.
pub fn parse_level(level: &str) -> Result<Level, LoggingError> {
    Level::from_str(level.trim()).map_err(|_| LoggingError::UnknownLevel(level.to_string()))
}

/// Installs a global formatting subscriber writing to stderr at `level`.
pub fn init(level: &str) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}

/// Like [`init`], but appends to `file` instead of stderr when one is given.
pub fn init_with_file(level: &str, file: Option<&Path>) -> Result<(), LoggingError> {
    let Some(path) = file else {
        return init(level);
    };
    let level = parse_level(level)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))
}
