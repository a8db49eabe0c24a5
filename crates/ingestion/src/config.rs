//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Drop policy when a subscriber queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropPolicy {
    /// Discard the frame being published
    #[default]
    DropNewest,
    /// Evict the oldest queued frame to make room
    DropOldest,
}

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Per-subscriber queue capacity (frames)
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

/// Bus metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames handed to `publish`
    pub frames_published: AtomicU64,

    /// Frame deliveries into subscriber queues
    pub frames_delivered: AtomicU64,

    /// Frames discarded because a queue was full
    pub frames_dropped: AtomicU64,

    /// Frames taken out of subscriber queues
    pub frames_received: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("daq_bus_frames_published_total").increment(1);
    }

    pub fn record_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("daq_bus_frames_dropped_total").increment(1);
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_published: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub frames_received: u64,
}
