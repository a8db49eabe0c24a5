//! Pipeline orchestrator
//!
//! Wires a simulated DAQ, the in-process bus, an in-memory host and the
//! subscriber engine, then drives `process` on a fixed cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::EngineConfig;
use host_sim::SimHost;
use ingestion::{LocalBus, SimulatedDaq, SimulatorConfig};
use observability::TracingDiagnostics;
use sync_engine::SubscriberEngine;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Engine configuration, address included
    pub engine: EngineConfig,

    /// Metadata document published by the simulated DAQ
    pub metadata: Bytes,

    /// Columns in every simulated block
    pub channels: usize,

    /// Samples per channel in every simulated block
    pub block_size: usize,

    /// Simulated blocks per second
    pub block_rate_hz: f64,

    /// Master clock frequency
    pub clock_hz: f64,

    /// Process cycle period
    pub cycle: Duration,

    /// Stop after this many cycles (None = unlimited)
    pub max_cycles: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the cycle limit or the timeout
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let config = self.config;
        let address = config.engine.address.clone();

        if let Some(port) = config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let bus = LocalBus::new();
        let publisher = bus
            .bind(&address)
            .with_context(|| format!("Failed to bind simulated DAQ to {address}"))?;
        // the engine picks this subscriber up on its first connect
        bus.preconnect(&address)?;

        let daq = SimulatedDaq::new(SimulatorConfig {
            metadata: config.metadata.clone(),
            channels: config.channels,
            samples_per_block: config.block_size,
            block_rate_hz: config.block_rate_hz,
            ..Default::default()
        });
        let daq_task = daq.start(publisher);

        let mut host = SimHost::new(config.clock_hz);
        let mut engine = SubscriberEngine::new(
            config.engine.clone(),
            bus.clone(),
            Arc::new(TracingDiagnostics),
        );

        // update sleeps between attempts
        let updated = tokio::task::block_in_place(|| engine.update(&mut host));
        if let Err(e) = updated {
            daq.stop();
            let _ = daq_task.await;
            return Err(CliError::update(&address, e.to_string()).into());
        }

        let channels = engine.channel_names().len();
        info!(address = %address, channels, "Subscriber connected");

        host.clock.set_ticks(master_ticks(start_time, config.clock_hz));
        engine.prepare(&host);

        let mut stats = PipelineStats {
            channels,
            ..Default::default()
        };

        let mut ticker = tokio::time::interval(config.cycle);
        loop {
            ticker.tick().await;

            if config
                .max_cycles
                .is_some_and(|max| stats.metrics.cycles >= max)
            {
                info!(cycles = stats.metrics.cycles, "Reached cycle limit");
                break;
            }
            if config
                .timeout
                .is_some_and(|timeout| start_time.elapsed() >= timeout)
            {
                warn!("Run timeout reached");
                break;
            }

            host.clock.set_ticks(master_ticks(start_time, config.clock_hz));
            let report = engine.process(&mut host);

            for (key, count) in host.recorder.sample_counts() {
                stats.metrics.record_samples(&key, count);
            }
            host.recorder.clear();

            stats.metrics.record_cycle(
                report.drift,
                report.frames_processed,
                report.frames_rejected,
                report.frames_pending,
            );
            debug!(
                processed = report.frames_processed,
                rejected = report.frames_rejected,
                pending = report.frames_pending,
                drift = ?report.drift,
                "Cycle done"
            );
        }

        stats.final_drift = engine.drift_stats();
        engine.close();

        daq.stop();
        stats.frames_published = daq_task
            .await
            .map_err(|e| CliError::run(format!("simulated DAQ task failed: {e}")))?;
        stats.bus = bus.metrics().snapshot();
        stats.duration = start_time.elapsed();

        Ok(stats)
    }
}

/// Master clock reading for the time elapsed since `origin`
fn master_ticks(origin: Instant, clock_hz: f64) -> u64 {
    (origin.elapsed().as_secs_f64() * clock_hz) as u64
}
