#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Steward Configuration
//!
//! This crate provides configuration management for Steward.
//! It handles loading, saving, and managing configuration files that specify:
//! - Logging configuration
//! - Generation options for cached-channel clients
//! - Input and output locations for the client plan
//!
//! Configuration is stored in TOML format and can be loaded from files or created
//! with sensible defaults for development and testing. Every section except
//! `[codegen]` may be omitted.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    /// Failed to parse the TOML configuration file
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize configuration to TOML format
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Configuration file was not found at the specified path
    #[error("Config file not found at: {0}")]
    NotFound(PathBuf),
    /// Could not locate the user's configuration directory
    #[error("Could not find user config directory")]
    ConfigDirUnavailable,
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Options shaping the generated client
    #[serde(default)]
    pub generation: GenerationOptions,
    /// Code generation settings
    pub codegen: CodegenConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path (optional)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self { Self { level: "info".to_string(), file: None } }
}

/// Accessibility of the generated client's constructors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Visible everywhere
    #[default]
    Public,
    /// Visible to subclasses
    Protected,
    /// Visible inside the defining assembly
    Internal,
    /// Visible only inside the client
    Private,
    /// Visible to subclasses and inside the defining assembly
    ProtectedInternal,
}

impl Visibility {
    /// Keyword spelling of this visibility
    pub fn keyword(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Internal => "internal",
            Visibility::Private => "private",
            Visibility::ProtectedInternal => "protected internal",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.keyword()) }
}

/// Generation options for a cached-channel client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationOptions {
    /// Interface to generate a client for; every service when unset
    pub source_interface_name: Option<String>,
    /// Explicit client type name instead of one derived from the interface
    pub client_name: Option<String>,
    /// Skip the asynchronous variant of every operation
    pub suppress_async_methods: bool,
    /// Leave out the "generated code" warning comments
    pub suppress_warning_comments: bool,
    /// Emit a client wrapping the lifecycle controller rather than a bare proxy
    pub wrapper: bool,
    /// Also emit a cancellable asynchronous variant of every operation
    pub include_cancellable_async: bool,
    /// Accessibility of generated constructors
    pub constructor_visibility: Visibility,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            source_interface_name: None,
            client_name: None,
            suppress_async_methods: false,
            suppress_warning_comments: false,
            wrapper: true,
            include_cancellable_async: true,
            constructor_visibility: Visibility::Public,
        }
    }
}

/// Code generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodegenConfig {
    /// Path to the service descriptor file
    pub input_path: PathBuf,
    /// Where to write the client plan
    pub output_dir: PathBuf,
}

impl Config {
    /// Load configuration from a TOML file at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save this configuration as a pretty-printed TOML file at `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Returns the default config file path:
    /// `{config_dir()}/steward/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or(ConfigError::ConfigDirUnavailable)?.join("steward");
        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` when given, otherwise from the default path if a file
    /// exists there, otherwise fall back to [`Config::default`].
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Ok(default) if default.exists() => Self::from_file(default),
            _ => Ok(Self::default()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            generation: GenerationOptions::default(),
            codegen: CodegenConfig {
                input_path: PathBuf::from("services.ir.json"),
                output_dir: PathBuf::from("generated"),
            },
        }
    }
}
