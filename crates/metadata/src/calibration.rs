//! Calibration resolving
//!
//! Chains each channel through its optional sensor and normalizes the
//! resulting delays against the channel-set baseline.

use std::collections::BTreeMap;

use contracts::{
    ChannelDescriptor, ContractError, EffectiveCalibration, MetadataSnapshot, SensorDescriptor,
};
use tracing::debug;

/// Calibration of one channel before delay normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCalibration {
    pub gain: f64,
    pub offset: f64,
    pub delay: i64,
}

/// Chain a channel through its optional sensor
///
/// ```text
/// gain   = c.gain * s.gain
/// offset = c.offset * s.gain + s.offset
/// delay  = c.delay + s.delay
/// ```
///
/// # Errors
/// `ContractError::MetadataParse` if the summed delay overflows i64.
pub fn chain(
    channel: &ChannelDescriptor,
    sensor: Option<&SensorDescriptor>,
) -> Result<RawCalibration, ContractError> {
    let Some(s) = sensor else {
        return Ok(RawCalibration {
            gain: channel.gain,
            offset: channel.offset,
            delay: channel.delay,
        });
    };

    let delay = channel.delay.checked_add(s.delay).ok_or_else(|| {
        delay_error(
            &channel.name,
            format!("channel delay {} plus sensor delay {} overflows", channel.delay, s.delay),
        )
    })?;

    Ok(RawCalibration {
        gain: channel.gain * s.gain,
        offset: channel.offset * s.gain + s.offset,
        delay,
    })
}

fn delay_error(channel: &str, message: String) -> ContractError {
    ContractError::metadata_parse(format!("daq_info.channel.{channel}.delay"), message)
}

/// Delay baseline of a channel set
///
/// Starts at 0 and is only ever lowered: an all-positive set keeps a
/// baseline of 0, only negative delays move it.
pub fn delay_baseline(delays: impl IntoIterator<Item = i64>) -> i64 {
    delays.into_iter().fold(0, i64::min)
}

/// Effective calibration of a whole channel set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    entries: BTreeMap<String, EffectiveCalibration>,
    raw: BTreeMap<String, RawCalibration>,
    delay_min: i64,
}

impl CalibrationTable {
    /// Effective calibration of a channel
    pub fn get(&self, channel: &str) -> Option<&EffectiveCalibration> {
        self.entries.get(channel)
    }

    /// Calibration of a channel before normalization (f64 precision)
    pub fn raw(&self, channel: &str) -> Option<&RawCalibration> {
        self.raw.get(channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EffectiveCalibration)> {
        self.entries.iter()
    }

    /// Baseline subtracted from every effective delay
    pub fn delay_min(&self) -> i64 {
        self.delay_min
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolve the effective calibration of every channel in a snapshot
///
/// # Errors
/// `ContractError::MetadataParse` if a chained delay overflows or a
/// normalized delay does not fit in i16.
pub fn resolve(snapshot: &MetadataSnapshot) -> Result<CalibrationTable, ContractError> {
    let raw = snapshot
        .channels
        .iter()
        .map(|(name, channel)| Ok((name.clone(), chain(channel, snapshot.sensor_for(channel))?)))
        .collect::<Result<BTreeMap<String, RawCalibration>, ContractError>>()?;

    let delay_min = delay_baseline(raw.values().map(|c| c.delay));

    let mut entries = BTreeMap::new();
    for (name, cal) in &raw {
        let normalized = cal.delay.checked_sub(delay_min).ok_or_else(|| {
            delay_error(
                name,
                format!("delay {} minus baseline {delay_min} overflows", cal.delay),
            )
        })?;
        let delay = i16::try_from(normalized).map_err(|_| {
            delay_error(name, format!("normalized delay {normalized} does not fit in i16"))
        })?;

        entries.insert(
            name.clone(),
            EffectiveCalibration {
                gain: cal.gain as f32,
                offset: cal.offset as f32,
                delay,
            },
        );
    }

    debug!(channels = entries.len(), delay_min, "calibration resolved");

    Ok(CalibrationTable {
        entries,
        raw,
        delay_min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BoardDescriptor;

    fn channel(
        name: &str,
        gain: f64,
        offset: f64,
        delay: i64,
        sensor: Option<&str>,
    ) -> ChannelDescriptor {
        ChannelDescriptor {
            name: name.to_string(),
            pin: name.to_string(),
            column_index: 0,
            unit: "V".to_string(),
            gain,
            offset,
            delay,
            sensor_name: sensor.map(str::to_string),
        }
    }

    fn snapshot(
        channels: Vec<ChannelDescriptor>,
        sensors: Vec<(&str, SensorDescriptor)>,
    ) -> MetadataSnapshot {
        MetadataSnapshot {
            board: BoardDescriptor {
                samplerate: 1000.0,
                adc_range: [-32768.0, 32767.0],
                differential: false,
            },
            channels: channels.into_iter().map(|c| (c.name.clone(), c)).collect(),
            sensors: sensors
                .into_iter()
                .map(|(n, s)| (n.to_string(), s))
                .collect(),
            daq_info: serde_json::Value::Null,
        }
    }

    fn delays(entries: &[(&str, i64)]) -> MetadataSnapshot {
        snapshot(
            entries
                .iter()
                .map(|(n, d)| channel(n, 1.0, 0.0, *d, None))
                .collect(),
            vec![],
        )
    }

    #[test]
    fn test_chain_without_sensor() {
        let c = channel("A", 2.0, 0.5, 4, None);
        let cal = chain(&c, None).unwrap();
        assert_eq!(cal, RawCalibration { gain: 2.0, offset: 0.5, delay: 4 });
    }

    #[test]
    fn test_chain_with_sensor() {
        let c = channel("A", 2.0, 0.5, 4, Some("s"));
        let s = SensorDescriptor { gain: 10.0, offset: 1.0, delay: -1 };
        let cal = chain(&c, Some(&s)).unwrap();
        assert_eq!(cal.gain, 20.0);
        assert_eq!(cal.offset, 0.5 * 10.0 + 1.0);
        assert_eq!(cal.delay, 3);
    }

    #[test]
    fn test_negative_delay_moves_baseline() {
        let table = resolve(&delays(&[("A", 3), ("B", 5), ("C", -2)])).unwrap();
        assert_eq!(table.delay_min(), -2);
        assert_eq!(table.get("A").unwrap().delay, 5);
        assert_eq!(table.get("B").unwrap().delay, 7);
        assert_eq!(table.get("C").unwrap().delay, 0);
    }

    #[test]
    fn test_positive_delays_keep_zero_baseline() {
        let table = resolve(&delays(&[("A", 3), ("B", 5)])).unwrap();
        assert_eq!(table.delay_min(), 0);
        assert_eq!(table.get("A").unwrap().delay, 3);
        assert_eq!(table.get("B").unwrap().delay, 5);
    }

    #[test]
    fn test_sensor_delay_counts_towards_baseline() {
        let snap = snapshot(
            vec![
                channel("A", 1.0, 0.0, 1, Some("probe")),
                channel("B", 1.0, 0.0, 0, None),
            ],
            vec![("probe", SensorDescriptor { gain: 1.0, offset: 0.0, delay: -4 })],
        );
        let table = resolve(&snap).unwrap();
        assert_eq!(table.delay_min(), -3);
        assert_eq!(table.get("A").unwrap().delay, 0);
        assert_eq!(table.get("B").unwrap().delay, 3);
        assert_eq!(table.raw("A").unwrap().delay, -3);
    }

    #[test]
    fn test_delay_overflow_rejected() {
        let err = resolve(&delays(&[("A", 40_000)])).unwrap_err();
        assert_eq!(parse_field(err), "daq_info.channel.A.delay");
    }

    #[test]
    fn test_extreme_delays_rejected() {
        let err = resolve(&delays(&[("A", i64::MAX), ("B", -1)])).unwrap_err();
        assert_eq!(parse_field(err), "daq_info.channel.A.delay");

        let err = resolve(&delays(&[("A", i64::MIN), ("B", 1)])).unwrap_err();
        assert_eq!(parse_field(err), "daq_info.channel.B.delay");
    }

    #[test]
    fn test_sensor_delay_overflow_rejected() {
        let snap = snapshot(
            vec![channel("A", 1.0, 0.0, i64::MAX, Some("slow"))],
            vec![("slow", SensorDescriptor { gain: 1.0, offset: 0.0, delay: 1 })],
        );
        let err = resolve(&snap).unwrap_err();
        assert_eq!(parse_field(err), "daq_info.channel.A.delay");
    }

    fn parse_field(err: ContractError) -> String {
        match err {
            ContractError::MetadataParse { field, .. } => field,
            other => panic!("expected metadata parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_set() {
        let table = resolve(&delays(&[])).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.delay_min(), 0);
    }
}
