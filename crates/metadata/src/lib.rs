//! # Metadata
//!
//! Metadata parsing and calibration resolving.
//!
//! Responsibilities:
//! - Parse a raw metadata payload into a validated `MetadataSnapshot`
//! - Resolve per-channel `EffectiveCalibration` through optional sensors
//! - Normalize channel delays against the channel-set baseline
//!
//! # Example
//!
//! ```no_run
//! use metadata::MetadataParser;
//!
//! # let payload: &[u8] = b"{}";
//! let snapshot = MetadataParser::parse(payload).unwrap();
//! let calibration = metadata::resolve(&snapshot).unwrap();
//! for (name, cal) in calibration.iter() {
//!     println!("{name}: gain={} offset={} delay={}", cal.gain, cal.offset, cal.delay);
//! }
//! ```

mod calibration;
mod parser;

pub use calibration::{chain, delay_baseline, resolve, CalibrationTable, RawCalibration};
pub use contracts::MetadataSnapshot;

use contracts::ContractError;

/// Metadata parser
///
/// Pure and deterministic: the same payload always yields the same snapshot.
pub struct MetadataParser;

impl MetadataParser {
    /// Parse a raw metadata payload (JSON bytes)
    ///
    /// # Errors
    /// `ContractError::MetadataParse` naming the first missing or malformed field.
    pub fn parse(payload: &[u8]) -> Result<MetadataSnapshot, ContractError> {
        let doc = parser::decode(payload)?;
        parser::parse_document(&doc)
    }

    /// Parse an already decoded metadata document
    pub fn parse_value(doc: &serde_json::Value) -> Result<MetadataSnapshot, ContractError> {
        parser::parse_document(doc)
    }

    /// Extract the `daq_info` subtree of a payload, used for drift comparison
    pub fn daq_info(payload: &[u8]) -> Result<serde_json::Value, ContractError> {
        let doc = parser::decode(payload)?;
        doc.get(parser::DAQ_INFO).cloned().ok_or_else(|| {
            ContractError::metadata_parse(parser::DAQ_INFO, "missing required field")
        })
    }
}
