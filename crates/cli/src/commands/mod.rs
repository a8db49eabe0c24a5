//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_subscriber;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::MetadataSnapshot;
use metadata::MetadataParser;

use crate::error::CliError;

/// Read and parse a metadata document
///
/// Returns the raw payload along with the parsed snapshot.
pub(crate) fn load_metadata(path: &Path) -> Result<(Vec<u8>, MetadataSnapshot)> {
    if !path.exists() {
        return Err(CliError::file_not_found(path.display().to_string()).into());
    }

    let payload = std::fs::read(path)
        .with_context(|| format!("Failed to read metadata from {}", path.display()))?;
    let snapshot = MetadataParser::parse(&payload)
        .map_err(|e| CliError::metadata_invalid(e.to_string()))?;

    Ok((payload, snapshot))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    pub const METADATA: &str = r#"{
        "daq_info": {
            "board": { "samplerate": 1000.0, "adc_range": [-10.0, 10.0], "differential": true },
            "channel": {
                "U1": {
                    "ai_pin": "AI0", "gain": 0.5, "offset": 0.0, "delay": 0,
                    "unit": "V", "sensor": "probe"
                },
                "U2": { "ai_pin": "AI1", "gain": 1.0, "offset": 0.25, "delay": -2, "unit": "V" }
            },
            "sensor": {
                "probe": { "gain": 2.0, "offset": 1.0, "delay": 3 }
            }
        },
        "data_columns": { "AI0": 0, "AI1": 1 }
    }"#;

    pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_metadata() {
        let file = fixtures::write_temp(fixtures::METADATA, ".json");
        let (payload, snapshot) = load_metadata(file.path()).unwrap();
        assert!(!payload.is_empty());
        assert_eq!(snapshot.channel_count(), 2);
    }

    #[test]
    fn test_load_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_metadata(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_invalid_metadata() {
        let file = fixtures::write_temp(r#"{"daq_info": {}}"#, ".json");
        let err = load_metadata(file.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CliError>(), Some(CliError::MetadataInvalid { .. })));
    }
}
