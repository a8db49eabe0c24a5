//! Host boundaries
//!
//! Channel registry, sample emission, master clock and diagnostics as seen
//! by the engine. The measurement host implements these; `host_sim`
//! provides an in-memory version.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ChannelKey, ContractError};

/// When samples of a channel occur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleOccurrence {
    /// Equidistant samples at the channel samplerate
    Sync,
    /// Individually timestamped samples
    Async,
}

/// Value type of a channel sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleValueType {
    Float32,
    Float64,
}

/// Sample format of a host channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFormat {
    pub occurrence: SampleOccurrence,
    pub value_type: SampleValueType,
    /// Values per sample
    pub arity: u8,
}

impl SampleFormat {
    /// Format of calibrated data channels
    pub const SYNC_SCALAR_F32: Self = Self {
        occurrence: SampleOccurrence::Sync,
        value_type: SampleValueType::Float32,
        arity: 1,
    };

    /// Format of the drift channel
    pub const ASYNC_SCALAR_F64: Self = Self {
        occurrence: SampleOccurrence::Async,
        value_type: SampleValueType::Float64,
        arity: 1,
    };
}

/// Value range of a channel (physical units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

/// Channel properties pushed to the host registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Display name used when the channel is created
    pub default_name: String,
    pub format: SampleFormat,
    /// Samplerate (Hz) and simple timebase; `None` for async channels
    pub samplerate: Option<f64>,
    pub range: Option<ValueRange>,
    pub unit: String,
    pub deletable: bool,
}

/// Handle of a channel in the host registry
///
/// Carries the channel key, so no property lookup or cast is needed to find
/// out which metadata channel a host channel belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    id: u32,
    key: ChannelKey,
}

impl ChannelHandle {
    pub fn new(id: u32, key: ChannelKey) -> Self {
        Self { id, key }
    }

    /// Host-local channel id
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }

    /// Metadata channel name, `None` for non-data channels
    #[inline]
    pub fn data_channel_name(&self) -> Option<&str> {
        self.key.data_channel_name()
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.key, self.id)
    }
}

/// Host channel registry
pub trait ChannelRegistry {
    /// Find a channel by key
    fn lookup(&self, key: &ChannelKey) -> Option<ChannelHandle>;

    /// Create a channel
    fn create(
        &mut self,
        key: ChannelKey,
        config: &ChannelConfig,
    ) -> Result<ChannelHandle, ContractError>;

    /// Update samplerate, range, unit of an existing channel
    fn configure(
        &mut self,
        handle: &ChannelHandle,
        config: &ChannelConfig,
    ) -> Result<(), ContractError>;

    /// Remove a channel
    fn remove(&mut self, handle: &ChannelHandle) -> Result<(), ContractError>;

    /// All channels owned by this engine instance
    fn list(&self) -> Vec<ChannelHandle>;
}

/// Host sample emission
pub trait SampleEmitter {
    /// Push a contiguous block of calibrated samples starting at `start_tick`
    fn add_samples(&mut self, channel: &ChannelHandle, start_tick: u64, samples: &[f32]);

    /// Push a single asynchronous sample at `tick`
    fn add_async_sample(&mut self, channel: &ChannelHandle, tick: u64, value: f64);
}

/// Master clock reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasterTimestamp {
    /// Current master tick
    pub ticks: u64,
    /// Master tick frequency (Hz)
    pub frequency: f64,
}

impl MasterTimestamp {
    /// `samplerate / frequency`
    #[inline]
    pub fn rate_factor(&self, samplerate: f64) -> f64 {
        samplerate / self.frequency
    }

    /// Current master time expressed in sample ticks, rounded
    ///
    /// `None` when the reading does not convert to a tick below `u64::MAX`,
    /// e.g. a zero or non-finite frequency.
    #[inline]
    pub fn sample_tick(&self, samplerate: f64) -> Option<u64> {
        let tick = (self.ticks as f64 * self.rate_factor(samplerate)).round();
        (tick.is_finite() && tick >= 0.0 && tick < u64::MAX as f64).then(|| tick as u64)
    }
}

/// Host master clock
pub trait MasterClock {
    fn master_timestamp(&self) -> MasterTimestamp;

    /// Acquisition start wall-clock time, nanoseconds since 1970 (diagnostics only)
    fn acquisition_start_ns(&self) -> u64;
}

/// Severity of a diagnostic report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Asynchronous message to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub severity: Severity,
    /// Component that raised the report
    pub source: String,
    pub message: String,
}

impl DiagnosticReport {
    pub fn new(severity: Severity, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, source, message)
    }

    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, source, message)
    }
}

/// Host diagnostics boundary
///
/// One instance is shared by convention and injected into each component.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, report: DiagnosticReport);
}
