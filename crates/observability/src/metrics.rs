//! Subscriber engine metrics
//!
//! Thin helpers over the `metrics` facade plus an in-memory aggregator for
//! drift and drain statistics.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// Record one frame taken off the transport
pub fn record_frame_received() {
    counter!("daq_frames_received_total").increment(1);
}

/// Record a rejected frame
///
/// `reason` is a short label such as `"frame_shape"`.
pub fn record_frame_rejected(reason: &str) {
    counter!("daq_frames_rejected_total", "reason" => reason.to_string()).increment(1);
}

/// Record samples pushed to the host for one channel
pub fn record_samples_emitted(channel: &str, count: usize) {
    counter!("daq_samples_emitted_total", "channel" => channel.to_string())
        .increment(count as u64);
}

/// Record the drift of one process cycle (ticks)
pub fn record_tick_drift(drift: i64) {
    gauge!("daq_tick_drift").set(drift as f64);
    histogram!("daq_tick_drift_hist").record(drift as f64);
}

/// Record a frame whose metadata differs from the session snapshot
pub fn record_metadata_drift() {
    counter!("daq_metadata_drift_total").increment(1);
}

/// Record the size of the active channel set
pub fn record_channel_set_size(size: usize) {
    gauge!("daq_channel_set_size").set(size as f64);
}

/// Record the outcome of an update cycle
pub fn record_update(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("daq_update_total", "status" => status.to_string()).increment(1);
}

/// Record the number of frames drained in one process cycle
pub fn record_drain(frames: usize) {
    histogram!("daq_drain_frames_per_cycle").record(frames as f64);
}

/// Drift and drain aggregator
///
/// Collects per-cycle results in memory for a run summary.
#[derive(Debug, Clone, Default)]
pub struct DriftMetricsAggregator {
    /// Process cycles seen
    pub cycles: u64,

    /// Frames processed over all cycles
    pub frames_processed: u64,

    /// Frames rejected over all cycles
    pub frames_rejected: u64,

    /// Cycles that stopped on the drain budget with frames still queued
    pub cycles_with_backlog: u64,

    /// Drift per cycle (ticks)
    pub drift_stats: RunningStats,

    /// Frames drained per cycle
    pub drain_stats: RunningStats,

    /// Samples emitted per channel
    pub samples_per_channel: HashMap<String, u64>,
}

impl DriftMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one process cycle into the aggregate
    pub fn record_cycle(
        &mut self,
        drift: Option<i64>,
        frames_processed: usize,
        frames_rejected: usize,
        frames_pending: bool,
    ) {
        self.cycles += 1;
        self.frames_processed += frames_processed as u64;
        self.frames_rejected += frames_rejected as u64;
        if frames_pending {
            self.cycles_with_backlog += 1;
        }
        if let Some(drift) = drift {
            self.drift_stats.push(drift as f64);
        }
        self.drain_stats
            .push((frames_processed + frames_rejected) as f64);
    }

    /// Add emitted samples for a channel
    pub fn record_samples(&mut self, channel: &str, count: usize) {
        *self
            .samples_per_channel
            .entry(channel.to_string())
            .or_insert(0) += count as u64;
    }

    pub fn summary(&self) -> MetricsSummary {
        let total = self.frames_processed + self.frames_rejected;
        MetricsSummary {
            cycles: self.cycles,
            frames_processed: self.frames_processed,
            frames_rejected: self.frames_rejected,
            cycles_with_backlog: self.cycles_with_backlog,
            reject_rate: if total > 0 {
                self.frames_rejected as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            drift_ticks: StatsSummary::from(&self.drift_stats),
            frames_per_cycle: StatsSummary::from(&self.drain_stats),
            samples_per_channel: self.samples_per_channel.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated run summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub cycles: u64,
    pub frames_processed: u64,
    pub frames_rejected: u64,
    pub cycles_with_backlog: u64,
    pub reject_rate: f64,
    pub drift_ticks: StatsSummary,
    pub frames_per_cycle: StatsSummary,
    pub samples_per_channel: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Subscriber Metrics Summary ===")?;
        writeln!(f, "Process cycles: {}", self.cycles)?;
        writeln!(f, "Frames processed: {}", self.frames_processed)?;
        writeln!(
            f,
            "Frames rejected: {} ({:.2}%)",
            self.frames_rejected, self.reject_rate
        )?;
        writeln!(f, "Cycles with backlog: {}", self.cycles_with_backlog)?;
        writeln!(f, "Drift (ticks): {}", self.drift_ticks)?;
        writeln!(f, "Frames per cycle: {}", self.frames_per_cycle)?;

        if !self.samples_per_channel.is_empty() {
            writeln!(f, "Samples per channel:")?;
            let mut channels: Vec<_> = self.samples_per_channel.iter().collect();
            channels.sort();
            for (channel, count) in channels {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_record_cycle() {
        let mut aggregator = DriftMetricsAggregator::new();

        aggregator.record_cycle(Some(-20), 3, 1, false);
        aggregator.record_cycle(Some(-10), 2, 0, true);
        aggregator.record_cycle(None, 0, 0, false);
        aggregator.record_samples("U1", 100);
        aggregator.record_samples("U1", 50);

        assert_eq!(aggregator.cycles, 3);
        assert_eq!(aggregator.frames_processed, 5);
        assert_eq!(aggregator.frames_rejected, 1);
        assert_eq!(aggregator.cycles_with_backlog, 1);
        assert_eq!(aggregator.drift_stats.count(), 2);
        assert!((aggregator.drift_stats.mean() + 15.0).abs() < 1e-10);
        assert_eq!(aggregator.samples_per_channel.get("U1"), Some(&150));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DriftMetricsAggregator::new();
        aggregator.record_cycle(Some(4), 3, 1, false);
        aggregator.record_samples("I1", 12);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Process cycles: 1"));
        assert!(output.contains("25.00%"));
        assert!(output.contains("I1: 12"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = DriftMetricsAggregator::new().summary();
        assert_eq!(summary.reject_rate, 0.0);
        assert_eq!(format!("{}", summary.drift_ticks), "N/A");
    }
}
