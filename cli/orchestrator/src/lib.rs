#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
//! Collection of utilities for the Steward CLI orchestrator.

use std::path::{Path, PathBuf};

use config::{ConfigError, GenerationOptions};
use ir::ServiceIR;
use planner::{ClientPlan, ClientPlanner, PlanError};
use serde::Serialize;
use thiserror::Error;

pub mod demo;

/// Errors that can occur during Steward operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or saved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Service descriptors could not be loaded.
    #[error("Failed to load service descriptors from '{path}': {message}")]
    Ir {
        /// Descriptor file
        path: PathBuf,
        /// Underlying failure
        message: String,
    },
    /// Planning rejected the descriptors.
    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),
    /// Logging could not be initialised.
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    /// A channel operation failed.
    #[error("Channel error: {0}")]
    Channel(#[from] channel::ChannelError),
    /// Writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serializing output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Refused to overwrite an existing file.
    #[error("'{0}' already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),
}

/// Result type alias for Steward CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Load service descriptors from a JSON file.
pub fn load_services(path: &Path) -> Result<ServiceIR> {
    ServiceIR::from_file(path)
        .map_err(|e| CliError::Ir { path: path.to_path_buf(), message: e.to_string() })
}

/// Plan the services in `ir`, restricted to `service` when given.
pub fn build_plans(
    ir: &ServiceIR,
    options: &GenerationOptions,
    service: Option<&str>,
) -> Result<Vec<ClientPlan>> {
    let mut options = options.clone();
    if let Some(service) = service {
        options.source_interface_name = Some(service.to_string());
    }
    Ok(ClientPlanner::new(options).plan(ir)?)
}

/// Write `value` as pretty JSON to `output`, or to stdout when `None`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, format!("{}\n", json))?;
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Write each plan to `{dir}/{type_name}.plan.json`, returning the paths written.
pub fn write_plans_to_dir(plans: &[ClientPlan], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    plans
        .iter()
        .map(|plan| {
            let path = dir.join(format!("{}.plan.json", plan.type_name));
            write_json(plan, Some(&path))?;
            Ok(path)
        })
        .collect()
}
