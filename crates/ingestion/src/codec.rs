//! Data part encoding: interleaved little-endian i16

use bytes::Bytes;

/// Encode samples as a little-endian i16 block
pub fn encode_block(samples: &[i16]) -> Bytes {
    let le: Vec<i16> = samples.iter().map(|s| s.to_le()).collect();
    Bytes::copy_from_slice(bytemuck::cast_slice(&le))
}

/// Interleave per-column sample sequences into one block
///
/// All columns must have the same length; extra samples of longer columns
/// are ignored.
pub fn interleave(columns: &[Vec<i16>]) -> Vec<i16> {
    let rows = columns.iter().map(Vec::len).min().unwrap_or(0);
    let mut block = Vec::with_capacity(rows * columns.len());
    for row in 0..rows {
        block.extend(columns.iter().map(|column| column[row]));
    }
    block
}
