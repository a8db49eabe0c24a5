//! Configuration validation
//!
//! Rules:
//! - declarative `validator` rules on `EngineConfig` (non-empty address,
//!   `max_attempts >= 1`, `history >= 1`, drain budget >= 1)
//! - drift channel key must not carry the data channel prefix
//! - drift channel key must not be blank

use contracts::{ContractError, EngineConfig, DATA_CHANNEL_PREFIX};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate an engine configuration
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &EngineConfig) -> Result<(), ContractError> {
    if let Err(errors) = config.validate() {
        let (field, message) = first_error(&errors, "")
            .unwrap_or_else(|| ("<config>".to_string(), errors.to_string()));
        return Err(ContractError::config_validation(field, message));
    }

    validate_drift_key(config)?;
    Ok(())
}

fn validate_drift_key(config: &EngineConfig) -> Result<(), ContractError> {
    let key = &config.drift.channel_key;
    if key.trim().is_empty() {
        return Err(ContractError::config_validation(
            "drift.channel_key",
            "channel_key cannot be blank",
        ));
    }
    if key.starts_with(DATA_CHANNEL_PREFIX) {
        return Err(ContractError::config_validation(
            "drift.channel_key",
            format!("channel_key '{key}' must not start with '{DATA_CHANNEL_PREFIX}'"),
        ));
    }
    Ok(())
}

/// First failing field in a stable (sorted) order, as a dotted path
fn first_error(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in fields {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };

        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                (path.clone(), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_error(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(idx, inner)| first_error(inner, &format!("{path}[{idx}]"))),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ContractError>) -> String {
        match result {
            Err(ContractError::ConfigValidation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(validate(&EngineConfig::new("inproc://daq")).is_ok());
    }

    #[test]
    fn test_empty_address() {
        assert_eq!(field_of(validate(&EngineConfig::new(""))), "address");
    }

    #[test]
    fn test_zero_attempts() {
        let mut config = EngineConfig::new("inproc://daq");
        config.retry.max_attempts = 0;
        assert_eq!(field_of(validate(&config)), "retry.max_attempts");
    }

    #[test]
    fn test_zero_drain_budget() {
        let mut config = EngineConfig::new("inproc://daq");
        config.drain.max_frames_per_cycle = Some(0);
        assert_eq!(field_of(validate(&config)), "drain.max_frames_per_cycle");
    }

    #[test]
    fn test_zero_history() {
        let mut config = EngineConfig::new("inproc://daq");
        config.drift.history = 0;
        assert_eq!(field_of(validate(&config)), "drift.history");
    }

    #[test]
    fn test_drift_key_with_data_prefix() {
        let mut config = EngineConfig::new("inproc://daq");
        config.drift.channel_key = format!("{DATA_CHANNEL_PREFIX}drift");
        assert_eq!(field_of(validate(&config)), "drift.channel_key");
    }

    #[test]
    fn test_blank_drift_key() {
        let mut config = EngineConfig::new("inproc://daq");
        config.drift.channel_key = "  ".to_string();
        assert_eq!(field_of(validate(&config)), "drift.channel_key");
    }
}
