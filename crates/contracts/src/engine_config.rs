//! Engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Subscriber engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Transport endpoint (connection string)
    #[validate(length(min = 1, message = "address cannot be empty"))]
    pub address: String,

    /// Reconnect / first-frame retry policy
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,

    /// Per-cycle drain policy
    #[serde(default)]
    #[validate(nested)]
    pub drain: DrainConfig,

    /// Drift metric configuration
    #[serde(default)]
    #[validate(nested)]
    pub drift: DriftConfig,
}

impl EngineConfig {
    /// Default configuration for an endpoint
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            retry: RetryConfig::default(),
            drain: DrainConfig::default(),
            drift: DriftConfig::default(),
        }
    }
}

/// First-frame retry policy used during update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetryConfig {
    /// Non-blocking poll attempts before the update fails
    #[validate(range(min = 1, message = "max_attempts must be >= 1"))]
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay_ms: 500,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.delay_ms)
    }
}

/// Drain policy of the process cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DrainConfig {
    /// Upper bound of frames handled per process cycle (None = drain everything)
    #[serde(default)]
    #[validate(range(min = 1, message = "max_frames_per_cycle must be >= 1"))]
    pub max_frames_per_cycle: Option<usize>,
}

/// Drift metric configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DriftConfig {
    /// Publish the drift metric on a host channel
    pub emit_channel: bool,
    /// Key of the drift channel (must not be a data channel key)
    #[validate(length(min = 1, message = "channel_key cannot be empty"))]
    pub channel_key: String,
    /// Number of recent drift values kept for statistics
    #[validate(range(min = 1, message = "history must be >= 1"))]
    pub history: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            emit_channel: true,
            channel_key: "DEBUG_DRIFT".to_string(),
            history: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new("inproc://daq");
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.delay_ms, 500);
        assert_eq!(config.drain.max_frames_per_cycle, None);
        assert!(config.drift.emit_channel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_address_rejected() {
        let config = EngineConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = EngineConfig::new("inproc://daq");
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"address": "inproc://x"}"#).unwrap();
        assert_eq!(config, EngineConfig::new("inproc://x"));
    }
}
