//! FrameTransport trait - Transport adapter abstraction
//!
//! The engine is transport-agnostic: it only needs atomic delivery of a
//! (metadata, data) pair, blocking or non-blocking.

use crate::{ContractError, RawFrame};

/// Established subscription delivering two-part frames.
///
/// # Example
///
/// ```ignore
/// let mut transport = connector.connect("inproc://daq")?;
/// while let Ok(Some(frame)) = transport.try_recv() {
///     println!("{} data bytes", frame.data.len());
/// }
/// ```
pub trait FrameTransport: Send {
    /// Address the transport is connected to
    fn endpoint(&self) -> &str;

    /// Non-blocking receive
    ///
    /// Returns `Ok(None)` when nothing is queued.
    fn try_recv(&mut self) -> Result<Option<RawFrame>, ContractError>;

    /// Blocking receive, waits indefinitely for the next frame
    fn recv_blocking(&mut self) -> Result<RawFrame, ContractError>;
}

/// Factory for transports, addressed by a connection string.
pub trait TransportConnector {
    type Transport: FrameTransport;

    /// Connect to an endpoint
    ///
    /// # Errors
    /// Returns `ContractError::TransportConnect` if the address is unreachable.
    fn connect(&self, address: &str) -> Result<Self::Transport, ContractError>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    fn try_recv(&mut self) -> Result<Option<RawFrame>, ContractError> {
        (**self).try_recv()
    }

    fn recv_blocking(&mut self) -> Result<RawFrame, ContractError> {
        (**self).recv_blocking()
    }
}
