//! Run statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use observability::DriftMetricsAggregator;
use sync_engine::DriftStats;

/// Statistics from a subscriber run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames published by the simulated DAQ
    pub frames_published: u64,

    /// Bus counters at the end of the run
    pub bus: MetricsSnapshot,

    /// Total duration of the run
    pub duration: Duration,

    /// Data channels in the final channel set
    pub channels: usize,

    /// Drift history of the final session
    pub final_drift: Option<DriftStats>,

    /// Per-cycle aggregates
    pub metrics: DriftMetricsAggregator,
}

impl PipelineStats {
    /// Processed frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.frames_processed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Frames dropped on the bus, as a percentage of published frames
    pub fn drop_rate(&self) -> f64 {
        if self.bus.frames_published > 0 {
            self.bus.frames_dropped as f64 / self.bus.frames_published as f64 * 100.0
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n== Subscriber Run ==\n");
        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Channels: {}", self.channels);
        println!("   ├─ Frames published: {}", self.frames_published);
        println!(
            "   ├─ Frames dropped on bus: {} ({:.2}%)",
            self.bus.frames_dropped,
            self.drop_rate()
        );
        println!("   └─ Processed FPS: {:.2}", self.fps());

        if let Some(ref drift) = self.final_drift {
            println!("\nFinal session drift (ticks)");
            println!("   └─ {}", drift);
        }

        println!("\n{}", self.metrics.summary());
    }
}
