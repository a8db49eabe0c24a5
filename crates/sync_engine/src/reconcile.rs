//! Channel set reconciliation
//!
//! Diffs a metadata snapshot against the host channel registry.

use std::collections::BTreeMap;

use contracts::{
    BoardDescriptor, ChannelConfig, ChannelDescriptor, ChannelHandle, ChannelKey, ChannelRegistry,
    ContractError, DriftConfig, MetadataSnapshot, SampleFormat, ValueRange,
};
use metadata::{CalibrationTable, RawCalibration};
use tracing::{debug, info};

/// Unit of the drift channel
pub const DRIFT_UNIT: &str = "ticks";

/// Physical value range of a channel for the board's ADC range
///
/// ```text
/// differential:  min = ((lo - hi)/2 - 0.5) * gain - offset
///                max = ((hi - lo)/2 - 0.5) * gain - offset
/// single-ended:  min = lo * gain - offset
///                max = hi * gain - offset
/// ```
pub fn value_range(board: &BoardDescriptor, gain: f64, offset: f64) -> ValueRange {
    let (lo, hi) = (board.adc_lo(), board.adc_hi());
    if board.differential {
        ValueRange {
            min: ((lo - hi) / 2.0 - 0.5) * gain - offset,
            max: ((hi - lo) / 2.0 - 0.5) * gain - offset,
        }
    } else {
        ValueRange {
            min: lo * gain - offset,
            max: hi * gain - offset,
        }
    }
}

/// Host configuration of a data channel
///
/// The range uses the chained f64 calibration, not the f32 one applied to
/// samples.
pub fn data_channel_config(
    channel: &ChannelDescriptor,
    board: &BoardDescriptor,
    calibration: &RawCalibration,
) -> ChannelConfig {
    ChannelConfig {
        default_name: channel.name.clone(),
        format: SampleFormat::SYNC_SCALAR_F32,
        samplerate: Some(board.samplerate),
        range: Some(value_range(board, calibration.gain, calibration.offset)),
        unit: channel.unit.clone(),
        deletable: true,
    }
}

/// Host configuration of the drift channel
pub fn drift_channel_config(config: &DriftConfig) -> ChannelConfig {
    ChannelConfig {
        default_name: config.channel_key.clone(),
        format: SampleFormat::ASYNC_SCALAR_F64,
        samplerate: None,
        range: None,
        unit: DRIFT_UNIT.to_string(),
        deletable: false,
    }
}

/// Result of one reconciliation
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Handle of every described channel, by channel name
    pub handles: BTreeMap<String, ChannelHandle>,
    pub created: Vec<String>,
    /// Channels that kept their handle
    pub kept: Vec<String>,
    pub removed: Vec<ChannelKey>,
    pub drift_channel: Option<ChannelHandle>,
}

/// Bring the registry in line with a snapshot
///
/// Missing channels are created, surviving channels keep their handle and
/// get samplerate, range and unit refreshed, data channels no longer
/// described are removed. Non-data channels are left alone.
///
/// # Errors
/// The first `ContractError::Registry` returned by the host.
pub fn reconcile<R: ChannelRegistry + ?Sized>(
    registry: &mut R,
    snapshot: &MetadataSnapshot,
    calibration: &CalibrationTable,
    drift: &DriftConfig,
) -> Result<ReconcileOutcome, ContractError> {
    let mut outcome = ReconcileOutcome::default();

    for (name, channel) in &snapshot.channels {
        let cal = match calibration.raw(name) {
            Some(raw) => *raw,
            None => metadata::chain(channel, snapshot.sensor_for(channel))?,
        };
        let config = data_channel_config(channel, &snapshot.board, &cal);
        let key = ChannelKey::data(name);

        let handle = match registry.lookup(&key) {
            Some(handle) => {
                registry.configure(&handle, &config)?;
                outcome.kept.push(name.clone());
                handle
            }
            None => {
                let handle = registry.create(key, &config)?;
                debug!(channel = %name, handle = %handle, "data channel created");
                outcome.created.push(name.clone());
                handle
            }
        };
        outcome.handles.insert(name.clone(), handle);
    }

    for handle in registry.list() {
        let stale = handle
            .data_channel_name()
            .is_some_and(|name| !snapshot.channels.contains_key(name));
        if stale {
            registry.remove(&handle)?;
            debug!(handle = %handle, "data channel removed");
            outcome.removed.push(handle.key().clone());
        }
    }

    if drift.emit_channel {
        let key = ChannelKey::new(&drift.channel_key);
        let config = drift_channel_config(drift);
        let handle = match registry.lookup(&key) {
            Some(handle) => {
                registry.configure(&handle, &config)?;
                handle
            }
            None => registry.create(key, &config)?,
        };
        outcome.drift_channel = Some(handle);
    }

    info!(
        created = outcome.created.len(),
        kept = outcome.kept.len(),
        removed = outcome.removed.len(),
        "channel set reconciled"
    );

    Ok(outcome)
}
