//! Sample recorder

use std::collections::HashMap;

use contracts::{ChannelHandle, SampleEmitter};

/// One block pushed with `add_samples`
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedBlock {
    pub start_tick: u64,
    pub samples: Vec<f32>,
}

/// One value pushed with `add_async_sample`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsyncSample {
    pub tick: u64,
    pub value: f64,
}

/// Records everything emitted, keyed by channel key
#[derive(Debug, Default, Clone)]
pub struct SampleRecorder {
    blocks: HashMap<String, Vec<EmittedBlock>>,
    async_samples: HashMap<String, Vec<AsyncSample>>,
}

impl SampleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocks(&self, key: &str) -> &[EmittedBlock] {
        self.blocks.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// All samples of a channel, concatenated in emission order
    pub fn samples(&self, key: &str) -> Vec<f32> {
        self.blocks(key)
            .iter()
            .flat_map(|b| b.samples.iter().copied())
            .collect()
    }

    pub fn async_samples(&self, key: &str) -> &[AsyncSample] {
        self.async_samples
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total samples emitted over all sync channels
    pub fn total_samples(&self) -> usize {
        self.blocks
            .values()
            .flat_map(|blocks| blocks.iter())
            .map(|b| b.samples.len())
            .sum()
    }

    /// Samples recorded per channel key, sorted by key
    pub fn sample_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .blocks
            .iter()
            .map(|(key, blocks)| (key.clone(), blocks.iter().map(|b| b.samples.len()).sum()))
            .collect();
        counts.sort();
        counts
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.async_samples.clear();
    }
}

impl SampleEmitter for SampleRecorder {
    fn add_samples(&mut self, channel: &ChannelHandle, start_tick: u64, samples: &[f32]) {
        self.blocks
            .entry(channel.key().to_string())
            .or_default()
            .push(EmittedBlock {
                start_tick,
                samples: samples.to_vec(),
            });
    }

    fn add_async_sample(&mut self, channel: &ChannelHandle, tick: u64, value: f64) {
        self.async_samples
            .entry(channel.key().to_string())
            .or_default()
            .push(AsyncSample { tick, value });
    }
}
