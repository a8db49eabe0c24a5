//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the subscriber engine.
//! Business crates depend on this crate only, never on each other in reverse.
//!
//! ## Time Model
//! - The host master clock (ticks + frequency) is the only time base
//! - Sample positions on the host timeline are `u64` ticks at the board samplerate

mod channel_key;
mod descriptor;
mod engine_config;
mod error;
mod frame;
mod host;
mod transport;

pub use channel_key::{ChannelKey, DATA_CHANNEL_PREFIX};
pub use descriptor::*;
pub use engine_config::*;
pub use error::*;
pub use frame::*;
pub use host::*;
pub use transport::{FrameTransport, TransportConnector};
