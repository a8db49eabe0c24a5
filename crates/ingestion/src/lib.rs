//! # Ingestion
//!
//! Frame transport for the subscriber engine.
//!
//! Responsibilities:
//! - Addressable publish/subscribe endpoints delivering two-part frames
//! - Blocking and non-blocking receive (`FrameTransport`)
//! - Backpressure management and drop policy
//! - Simulated DAQ publisher for tests and demos
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::{FrameTransport, TransportConnector};
//! use ingestion::LocalBus;
//!
//! let bus = LocalBus::new();
//! let publisher = bus.bind("inproc://daq")?;
//! let mut subscriber = bus.connect("inproc://daq")?;
//!
//! publisher.publish(frame);
//! while let Some(frame) = subscriber.try_recv()? {
//!     // Process frame
//! }
//! ```

mod bus;
mod codec;
mod config;
mod error;
mod simulator;

// Re-exports
pub use bus::{BusSubscriber, FramePublisher, LocalBus};
pub use codec::{encode_block, interleave};
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::RawFrame;
pub use error::{IngestionError, Result};
pub use simulator::{FrameGenerator, SimulatedDaq, SimulatorConfig};
