//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Metadata document rejected by the parser
    #[error("Invalid metadata document: {message}")]
    MetadataInvalid { message: String },

    /// Engine configuration rejected
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Initial update against the publisher failed
    #[error("Update from publisher at {address} failed: {message}")]
    Update { address: String, message: String },

    /// Subscriber run failed after start
    #[error("Subscriber run failed: {message}")]
    Run { message: String },
}

impl CliError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn metadata_invalid(message: impl Into<String>) -> Self {
        Self::MetadataInvalid {
            message: message.into(),
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn update(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Update {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn run(message: impl Into<String>) -> Self {
        Self::Run {
            message: message.into(),
        }
    }
}
