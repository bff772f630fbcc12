//! Unified error types for Gangway

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Gangway operations
#[derive(Error, Debug)]
pub enum Error {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // Config errors
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Address errors
    #[error("Invalid jail address '{0}': expected jail[:owner]@host")]
    Address(String),

    // Resolution errors
    #[error("Jail listing failed: {0}")]
    Resolution(String),

    #[error("No jail with name or hostname '{0}'")]
    JailNotFound(String),

    // Command rewrite errors
    #[error("Command rewrite failed: {0}")]
    Rewrite(String),

    // Transfer errors
    #[error("Transfer step '{step}' failed: {output}")]
    Transfer { step: &'static str, output: String },

    // Transport errors
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    // Output serialization
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Gangway operations
pub type Result<T> = std::result::Result<T, Error>;
