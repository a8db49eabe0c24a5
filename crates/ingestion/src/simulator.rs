//! Simulated DAQ publisher
//!
//! Publishes synthetic interleaved frames for a metadata document, for tests
//! and for running the subscriber without acquisition hardware.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::RawFrame;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::bus::FramePublisher;
use crate::codec::{encode_block, interleave};

/// Simulated publisher configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Metadata document (JSON) sent with the frames
    pub metadata: Bytes,

    /// Number of interleaved columns
    pub channels: usize,

    /// Samples per channel in each block
    pub samples_per_block: usize,

    /// Blocks published per second
    pub block_rate_hz: f64,

    /// Sine amplitude in raw counts
    pub amplitude: i16,

    /// Sine period in samples
    pub period_samples: f64,

    /// Attach the metadata part to every frame, not only the first
    pub metadata_every_frame: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            metadata: Bytes::new(),
            channels: 1,
            samples_per_block: 100,
            block_rate_hz: 10.0,
            amplitude: 10_000,
            period_samples: 50.0,
            metadata_every_frame: true,
        }
    }
}

/// Deterministic frame source
#[derive(Debug, Clone)]
pub struct FrameGenerator {
    config: SimulatorConfig,
    sample_index: u64,
    frames: u64,
}

impl FrameGenerator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            sample_index: 0,
            frames: 0,
        }
    }

    /// Frames generated so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Build the next frame; column `c` carries a sine shifted by `c * PI/4`
    pub fn next_frame(&mut self) -> RawFrame {
        let n = self.config.samples_per_block;
        let period = self.config.period_samples.max(1.0);
        let amplitude = f64::from(self.config.amplitude);

        let columns: Vec<Vec<i16>> = (0..self.config.channels)
            .map(|column| {
                let phase = column as f64 * PI / 4.0;
                (0..n as u64)
                    .map(|i| {
                        let t = (self.sample_index + i) as f64 / period;
                        (amplitude * (2.0 * PI * t + phase).sin()).round() as i16
                    })
                    .collect()
            })
            .collect();

        let metadata = if self.frames == 0 || self.config.metadata_every_frame {
            self.config.metadata.clone()
        } else {
            Bytes::new()
        };

        self.sample_index += n as u64;
        self.frames += 1;
        RawFrame::new(metadata, encode_block(&interleave(&columns)))
    }
}

/// Simulated DAQ publishing on a tokio task
pub struct SimulatedDaq {
    config: SimulatorConfig,
    running: Arc<AtomicBool>,
}

impl SimulatedDaq {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start publishing, returns the task handle yielding the frame count
    pub fn start(&self, publisher: FramePublisher) -> JoinHandle<u64> {
        let mut generator = FrameGenerator::new(self.config.clone());
        let interval = Duration::from_secs_f64(1.0 / self.config.block_rate_hz.max(1e-3));
        let running = self.running.clone();

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            debug!(
                address = %publisher.address(),
                channels = generator.config.channels,
                interval_ms = interval.as_millis() as u64,
                "simulated daq started"
            );

            let mut ticker = tokio::time::interval(interval);
            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                let delivered = publisher.publish(generator.next_frame());
                trace!(frame = generator.frame_count(), delivered, "simulated frame published");
            }

            debug!(frames = generator.frame_count(), "simulated daq stopped");
            generator.frame_count()
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use contracts::{FrameTransport, TransportConnector};

    fn config() -> SimulatorConfig {
        SimulatorConfig {
            metadata: Bytes::from_static(b"{\"daq_info\":{}}"),
            channels: 2,
            samples_per_block: 4,
            metadata_every_frame: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_generator_shape() {
        let mut generator = FrameGenerator::new(config());
        let first = generator.next_frame();
        assert!(first.has_metadata());
        assert_eq!(first.sample_count(), 8);

        let second = generator.next_frame();
        assert!(!second.has_metadata());
        assert_eq!(second.sample_count(), 8);
        assert_eq!(generator.frame_count(), 2);
    }

    #[test]
    fn test_generator_deterministic() {
        let mut a = FrameGenerator::new(config());
        let mut b = FrameGenerator::new(config());
        assert_eq!(a.next_frame(), b.next_frame());
        assert_eq!(a.next_frame(), b.next_frame());
    }

    #[tokio::test]
    async fn test_simulated_daq_publishes() {
        let bus = LocalBus::new();
        let publisher = bus.bind("inproc://sim").unwrap();
        let mut sub = bus.connect("inproc://sim").unwrap();

        let daq = SimulatedDaq::new(SimulatorConfig {
            block_rate_hz: 200.0,
            ..config()
        });
        let handle = daq.start(publisher);

        tokio::time::sleep(Duration::from_millis(50)).await;
        daq.stop();
        let published = handle.await.unwrap();

        assert!(published >= 1);
        let first = sub.try_recv().unwrap().unwrap();
        assert!(first.has_metadata());
    }
}
