//! RawFrame - Transport output
//!
//! One atomically delivered two-part message.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Two-part message as delivered by a transport
///
/// `metadata` is the JSON document describing the acquisition (may be empty
/// on steady-state frames), `data` the interleaved little-endian i16 block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Metadata part (JSON, zero-copy)
    pub metadata: Bytes,

    /// Data part (little-endian i16, zero-copy)
    pub data: Bytes,
}

impl RawFrame {
    /// Create a frame from both parts
    pub fn new(metadata: impl Into<Bytes>, data: impl Into<Bytes>) -> Self {
        Self {
            metadata: metadata.into(),
            data: data.into(),
        }
    }

    /// Whether the frame carries a metadata document
    #[inline]
    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Number of whole i16 samples in the data part
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.data.len() / std::mem::size_of::<i16>()
    }
}
