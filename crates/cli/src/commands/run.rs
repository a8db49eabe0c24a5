//! `run` command implementation.

use anyhow::{Context, Result};
use bytes::Bytes;
use config_loader::ConfigLoader;
use contracts::{EngineConfig, MetadataSnapshot};
use std::time::Duration;
use tracing::{info, warn};

use super::load_metadata;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Address used when neither a config file nor `--address` names one
pub const DEFAULT_ADDRESS: &str = "inproc://daq";

/// Execute the `run` command
pub async fn run_subscriber(args: &RunArgs) -> Result<()> {
    let engine = load_engine_config(args)?;

    info!(metadata = %args.metadata.display(), "Loading metadata document");
    let (payload, snapshot) = load_metadata(&args.metadata)?;

    info!(
        address = %engine.address,
        samplerate = snapshot.board.samplerate,
        channels = snapshot.channel_count(),
        "Configuration loaded"
    );

    let block_samplerate = args.block_size as f64 * args.block_rate_hz;
    if (block_samplerate - snapshot.board.samplerate).abs() > f64::EPSILON {
        warn!(
            board = snapshot.board.samplerate,
            simulated = block_samplerate,
            "Simulated sample rate differs from board sample rate, expect drift"
        );
    }

    if args.dry_run {
        info!("Dry run mode - inputs are valid, exiting");
        print_run_summary(&engine, &snapshot, args);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        engine,
        metadata: Bytes::from(payload),
        channels: snapshot.channel_count(),
        block_size: args.block_size,
        block_rate_hz: args.block_rate_hz,
        clock_hz: args.clock_hz,
        cycle: Duration::from_millis(args.cycle_ms.max(1)),
        max_cycles: (args.cycles > 0).then_some(args.cycles),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting subscriber...");

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Subscriber run failed")?;
            info!(
                frames_processed = stats.metrics.frames_processed,
                frames_rejected = stats.metrics.frames_rejected,
                duration_secs = stats.duration.as_secs_f64(),
                fps = format!("{:.2}", stats.fps()),
                "Subscriber run completed"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping subscriber...");
        }
    }

    info!("DAQ Subscriber finished");
    Ok(())
}

/// Engine configuration from the optional file plus CLI overrides
fn load_engine_config(args: &RunArgs) -> Result<EngineConfig> {
    let mut config = match args.config {
        Some(ref path) => {
            if !path.exists() {
                return Err(CliError::file_not_found(path.display().to_string()).into());
            }
            info!(config = %path.display(), "Loading engine configuration");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => EngineConfig::new(DEFAULT_ADDRESS),
    };

    if let Some(ref address) = args.address {
        info!(address = %address, "Overriding address from CLI");
        config.address = address.clone();
    }
    if let Some(retries) = args.retries {
        config.retry.max_attempts = retries;
    }
    if let Some(delay_ms) = args.retry_delay_ms {
        config.retry.delay_ms = delay_ms;
    }
    if let Some(max_frames) = args.max_frames_per_cycle {
        config.drain.max_frames_per_cycle = Some(max_frames);
    }

    ConfigLoader::validate(&config).map_err(|e| CliError::config_validation(e.to_string()))?;
    Ok(config)
}

/// Resolve on Ctrl+C or SIGTERM
///
/// A handler that fails to install never resolves.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print the run setup for dry-run mode
fn print_run_summary(engine: &EngineConfig, snapshot: &MetadataSnapshot, args: &RunArgs) {
    println!("\n=== Run Summary ===\n");
    println!("Engine:");
    println!("  Address: {}", engine.address);
    println!(
        "  Retry: {} attempts, {} ms apart",
        engine.retry.max_attempts, engine.retry.delay_ms
    );
    match engine.drain.max_frames_per_cycle {
        Some(max) => println!("  Drain budget: {} frames per cycle", max),
        None => println!("  Drain budget: unbounded"),
    }
    if engine.drift.emit_channel {
        println!("  Drift channel: {}", engine.drift.channel_key);
    }

    println!("\nBoard:");
    println!("  Sample rate: {} Hz", snapshot.board.samplerate);
    println!(
        "  ADC range: [{}, {}]{}",
        snapshot.board.adc_lo(),
        snapshot.board.adc_hi(),
        if snapshot.board.differential { " differential" } else { "" }
    );

    println!("\nChannels ({}):", snapshot.channel_count());
    for channel in snapshot.channels.values() {
        println!(
            "  - {} (pin {}, column {}, {})",
            channel.name, channel.pin, channel.column_index, channel.unit
        );
    }

    println!("\nSimulation:");
    println!(
        "  {} samples x {} Hz, cycle {} ms, clock {} Hz",
        args.block_size, args.block_rate_hz, args.cycle_ms, args.clock_hz
    );
    println!();
}
