//! # Sync Engine
//!
//! Turns a stream of metadata-described, interleaved acquisition frames into
//! calibrated per-channel sample blocks aligned to the host master clock.
//!
//! Responsibilities:
//! - Channel set reconciliation against the host registry
//! - Frame demultiplexing and calibration
//! - Tick locking, sample placement and drift observation
//! - `SubscriberEngine`: update / process cycles over a `FrameTransport`
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::SubscriberEngine;
//!
//! let mut engine = SubscriberEngine::new(config, bus, diagnostics);
//! engine.update(&mut host)?;
//! engine.prepare(&host);
//!
//! // once per host cycle
//! let report = engine.process(&mut host);
//! ```

mod demux;
mod engine;
mod reconcile;
mod tick;

// Re-exports
pub use demux::Demultiplexer;
pub use engine::{ProcessReport, SubscriberEngine, DIAGNOSTICS_SOURCE};
pub use reconcile::{
    data_channel_config, drift_channel_config, reconcile, value_range, ReconcileOutcome,
    DRIFT_UNIT,
};
pub use tick::{target_tick, tick_drift, DriftStats, Placement, TickSynchronizer, TICK_UNSET};

// Re-export contracts types
pub use contracts::{EngineConfig, MetadataSnapshot, RawFrame};
