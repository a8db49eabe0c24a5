//! Layered error definitions
//!
//! Categorized by source: config / transport / metadata / frame / host

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Endpoint unreachable or no frame within the retry budget
    #[error("transport connect error for '{address}' after {attempts} attempt(s): {message}")]
    TransportConnect {
        address: String,
        attempts: u32,
        message: String,
    },

    /// Receive fault on an established transport
    #[error("transport error on '{endpoint}': {message}")]
    Transport { endpoint: String, message: String },

    // ===== Metadata Errors =====
    /// Missing or malformed required metadata field
    #[error("metadata parse error at '{field}': {message}")]
    MetadataParse { field: String, message: String },

    // ===== Frame Errors =====
    /// Data block not divisible by the known channel count
    #[error(
        "frame shape error: {len_bytes} byte block does not split into \
         {channels} channel(s) of i16 samples"
    )]
    FrameShape { len_bytes: usize, channels: usize },

    // ===== Host Errors =====
    /// Host channel registry refused an operation
    #[error("channel registry error for '{key}': {message}")]
    Registry { key: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport connect error
    pub fn transport_connect(
        address: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::TransportConnect {
            address: address.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Create transport receive error
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create metadata parse error
    pub fn metadata_parse(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetadataParse {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create channel registry error
    pub fn registry(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Registry {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Whether the error aborts an update cycle
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FrameShape { .. } | Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parse_names_field() {
        let err = ContractError::metadata_parse("daq_info.board.samplerate", "missing field");
        assert!(err.to_string().contains("daq_info.board.samplerate"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_frame_shape_not_fatal() {
        let err = ContractError::FrameShape {
            len_bytes: 10,
            channels: 2,
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("2 channel(s)"));
    }

    #[test]
    fn test_transport_connect_context() {
        let err = ContractError::transport_connect("inproc://daq", 2, "no frame received");
        let msg = err.to_string();
        assert!(msg.contains("inproc://daq"));
        assert!(msg.contains("2 attempt(s)"));
    }
}
