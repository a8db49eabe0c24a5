//! Frame demultiplexer
//!
//! Splits an interleaved little-endian i16 block into per-channel columns and
//! applies `raw * gain - offset`.

use contracts::{ContractError, EffectiveCalibration};

/// Decoder for one channel count, keeps its raw buffer across frames
#[derive(Debug, Clone)]
pub struct Demultiplexer {
    channels: usize,
    raw: Vec<i16>,
}

impl Demultiplexer {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            raw: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decode a data block
    ///
    /// Returns the per-channel sample count.
    ///
    /// # Errors
    /// `ContractError::FrameShape` when the block is not a whole number of
    /// i16 samples for every channel. The previous block is discarded either way.
    pub fn split(&mut self, data: &[u8]) -> Result<usize, ContractError> {
        self.raw.clear();

        let sample_bytes = std::mem::size_of::<i16>();
        if self.channels == 0
            || data.len() % sample_bytes != 0
            || (data.len() / sample_bytes) % self.channels != 0
        {
            return Err(ContractError::FrameShape {
                len_bytes: data.len(),
                channels: self.channels,
            });
        }

        match bytemuck::try_cast_slice::<u8, i16>(data) {
            Ok(samples) => self.raw.extend(samples.iter().map(|&s| i16::from_le(s))),
            // unaligned payload
            Err(_) => self.raw.extend(
                bytemuck::pod_collect_to_vec::<u8, i16>(data)
                    .into_iter()
                    .map(i16::from_le),
            ),
        }

        Ok(self.raw.len() / self.channels)
    }

    /// Samples per channel of the current block
    pub fn samples_per_channel(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.raw.len() / self.channels
        }
    }

    /// Raw column `index` of the current block
    pub fn raw_column(&self, index: usize) -> impl Iterator<Item = i16> + '_ {
        self.raw
            .iter()
            .skip(index)
            .step_by(self.channels.max(1))
            .copied()
    }

    /// Calibrated column `index` of the current block into `out`
    pub fn column(&self, index: usize, calibration: &EffectiveCalibration, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.raw_column(index).map(|raw| calibration.apply(raw)));
    }
}
