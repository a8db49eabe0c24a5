//! `validate` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::MetadataSnapshot;
use serde::Serialize;
use tracing::info;

use super::load_metadata;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    metadata_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<MetadataSummary>,
}

#[derive(Serialize)]
struct MetadataSummary {
    samplerate: f64,
    differential: bool,
    channel_count: usize,
    sensor_count: usize,
    delay_baseline: i64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(metadata = %args.metadata.display(), "Validating metadata document");

    let result = validate_inputs(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Validation failed")
    }
}

fn validate_inputs(args: &ValidateArgs) -> ValidationResult {
    let mut result = ValidationResult {
        valid: false,
        metadata_path: args.metadata.display().to_string(),
        config_path: args.config.as_ref().map(|p| p.display().to_string()),
        error: None,
        warnings: None,
        summary: None,
    };

    if let Some(ref path) = args.config {
        if let Err(e) = ConfigLoader::load_from_path(path) {
            result.error = Some(format!("config: {e}"));
            return result;
        }
    }

    let snapshot = match load_metadata(&args.metadata) {
        Ok((_, snapshot)) => snapshot,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };

    let calibration = match metadata::resolve(&snapshot) {
        Ok(calibration) => calibration,
        Err(e) => {
            result.error = Some(e.to_string());
            return result;
        }
    };

    let warnings = collect_warnings(&snapshot);
    result.valid = true;
    result.warnings = (!warnings.is_empty()).then_some(warnings);
    result.summary = Some(MetadataSummary {
        samplerate: snapshot.board.samplerate,
        differential: snapshot.board.differential,
        channel_count: snapshot.channel_count(),
        sensor_count: snapshot.sensors.len(),
        delay_baseline: calibration.delay_min(),
    });
    result
}

/// Non-fatal issues of a parsed document
fn collect_warnings(snapshot: &MetadataSnapshot) -> Vec<String> {
    let mut warnings = Vec::new();

    if snapshot.channels.is_empty() {
        warnings.push("No channels described - every data frame will be rejected".to_string());
    }

    let mut columns: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for channel in snapshot.channels.values() {
        columns
            .entry(channel.column_index)
            .or_default()
            .push(channel.name.as_str());

        if channel.gain == 0.0 {
            warnings.push(format!("Channel '{}' has zero gain", channel.name));
        }
    }

    for (column, names) in columns {
        if names.len() > 1 {
            warnings.push(format!("Column {} is shared by {}", column, names.join(", ")));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Metadata document is valid: {}", result.metadata_path);
        if let Some(ref config) = result.config_path {
            println!("✓ Engine configuration is valid: {}", config);
        }

        if let Some(ref summary) = result.summary {
            println!("\n  Sample rate: {} Hz", summary.samplerate);
            println!("  Differential: {}", summary.differential);
            println!("  Channels: {}", summary.channel_count);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Delay baseline: {}", summary.delay_baseline);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Validation failed: {}", result.metadata_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
