//! Metadata Parser output
//!
//! Validated, typed view of one metadata snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Acquisition board description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDescriptor {
    /// Samplerate (Hz)
    pub samplerate: f64,

    /// ADC range (lower, upper) in raw counts
    pub adc_range: [f64; 2],

    /// Differential inputs
    pub differential: bool,
}

impl BoardDescriptor {
    /// Lower ADC bound
    #[inline]
    pub fn adc_lo(&self) -> f64 {
        self.adc_range[0]
    }

    /// Upper ADC bound
    #[inline]
    pub fn adc_hi(&self) -> f64 {
        self.adc_range[1]
    }
}

/// External sensor attached to a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub gain: f64,
    pub offset: f64,
    /// Delay in samples
    pub delay: i64,
}

/// One acquired channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Unique channel name (stable identity across frames)
    pub name: String,

    /// Pin identifier the channel is wired to
    pub pin: String,

    /// Position of this channel's samples within an interleaved block
    pub column_index: usize,

    /// Physical unit
    pub unit: String,

    pub gain: f64,
    pub offset: f64,

    /// Delay in samples
    pub delay: i64,

    /// Referenced sensor name, if any
    pub sensor_name: Option<String>,
}

/// Complete, validated metadata snapshot
///
/// Built once per update. `daq_info` keeps the raw acquisition description
/// so later frames can be compared against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub board: BoardDescriptor,

    /// Channel name -> descriptor
    pub channels: BTreeMap<String, ChannelDescriptor>,

    /// Sensor name -> descriptor
    pub sensors: BTreeMap<String, SensorDescriptor>,

    /// Raw `daq_info` subtree the snapshot was parsed from
    pub daq_info: serde_json::Value,
}

impl MetadataSnapshot {
    /// Number of channels interleaved in every data block
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Sensor referenced by a channel, if any
    pub fn sensor_for(&self, channel: &ChannelDescriptor) -> Option<&SensorDescriptor> {
        channel
            .sensor_name
            .as_deref()
            .and_then(|name| self.sensors.get(name))
    }
}

/// Per-channel calibration after chaining through the optional sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveCalibration {
    pub gain: f32,
    pub offset: f32,
    /// Delay normalized against the channel-set baseline (>= 0)
    pub delay: i16,
}

impl EffectiveCalibration {
    /// Identity calibration
    pub const IDENTITY: Self = Self {
        gain: 1.0,
        offset: 0.0,
        delay: 0,
    };

    /// Apply calibration to one raw sample: `raw * gain - offset`
    #[inline]
    pub fn apply(&self, raw: i16) -> f32 {
        f32::from(raw) * self.gain - self.offset
    }
}

impl Default for EffectiveCalibration {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_calibration() {
        let cal = EffectiveCalibration::IDENTITY;
        for raw in [i16::MIN, -1, 0, 1, 1234, i16::MAX] {
            assert_eq!(cal.apply(raw), f32::from(raw));
        }
    }

    #[test]
    fn test_multiply_then_subtract() {
        let cal = EffectiveCalibration {
            gain: 2.0,
            offset: 1.0,
            delay: 0,
        };
        // raw*gain - offset, not (raw - offset)*gain
        assert_eq!(cal.apply(10), 19.0);
        assert_ne!(cal.apply(10), 18.0);
    }
}
