//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// DAQ Subscriber - frame subscriber engine for DAQ boards
#[derive(Parser, Debug)]
#[command(
    name = "daq-subscriber",
    author,
    version,
    about = "Subscriber engine for DAQ sample frames",
    long_about = "Subscribes to a DAQ frame publisher, turns the metadata document into \n\
                  a host channel set, demultiplexes interleaved sample blocks and keeps \n\
                  them aligned with the master clock.\n\n\
                  The `run` command drives the engine against a simulated DAQ and an \n\
                  in-memory host."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        env = "DAQ_SUBSCRIBER_VERBOSE"
    )]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DAQ_SUBSCRIBER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the subscriber against a simulated DAQ
    Run(RunArgs),

    /// Validate a metadata document (and optionally an engine config)
    Validate(ValidateArgs),

    /// Display the channel set described by a metadata document
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Metadata document (JSON) published by the simulated DAQ
    #[arg(short, long, env = "DAQ_SUBSCRIBER_METADATA")]
    pub metadata: PathBuf,

    /// Engine configuration file (TOML or JSON)
    #[arg(short, long, env = "DAQ_SUBSCRIBER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the publisher address
    #[arg(long, env = "DAQ_SUBSCRIBER_ADDRESS")]
    pub address: Option<String>,

    /// Override the number of connection attempts
    #[arg(long)]
    pub retries: Option<u32>,

    /// Override the delay between connection attempts (ms)
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Override the number of frames drained per cycle
    #[arg(long)]
    pub max_frames_per_cycle: Option<usize>,

    /// Number of process cycles to run (0 = until Ctrl+C)
    #[arg(long, default_value = "0", env = "DAQ_SUBSCRIBER_CYCLES")]
    pub cycles: u64,

    /// Process cycle period in milliseconds
    #[arg(long, default_value = "100")]
    pub cycle_ms: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "DAQ_SUBSCRIBER_TIMEOUT")]
    pub timeout: u64,

    /// Master clock frequency in Hz
    #[arg(long, default_value = "1000000")]
    pub clock_hz: f64,

    /// Samples per channel in each simulated block
    #[arg(long, default_value = "100")]
    pub block_size: usize,

    /// Simulated blocks per second
    #[arg(long, default_value = "10")]
    pub block_rate_hz: f64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DAQ_SUBSCRIBER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate inputs and exit without running
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Metadata document to validate
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Engine configuration file to validate alongside
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Metadata document
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show effective calibration and value ranges
    #[arg(long)]
    pub calibration: bool,

    /// Show sensor definitions
    #[arg(long)]
    pub sensors: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
