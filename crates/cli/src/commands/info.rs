//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelKey, MetadataSnapshot};
use metadata::CalibrationTable;
use serde::Serialize;
use sync_engine::value_range;
use tracing::info;

use super::load_metadata;
use crate::cli::InfoArgs;

/// Channel set info for JSON output
#[derive(Serialize)]
struct MetadataInfo {
    board: BoardInfo,
    delay_baseline: i64,
    channels: Vec<ChannelInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct BoardInfo {
    samplerate: f64,
    adc_range: [f64; 2],
    differential: bool,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: String,
    key: String,
    pin: String,
    column: usize,
    unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calibration: Option<CalibrationInfo>,
}

#[derive(Serialize)]
struct CalibrationInfo {
    gain: f64,
    offset: f64,
    delay: i16,
    range: [f64; 2],
}

#[derive(Serialize)]
struct SensorInfo {
    name: String,
    gain: f64,
    offset: f64,
    delay: i64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(metadata = %args.metadata.display(), "Loading metadata info");

    let (_, snapshot) = load_metadata(&args.metadata)?;
    let calibration = metadata::resolve(&snapshot)
        .with_context(|| format!("Failed to resolve calibration of {}", args.metadata.display()))?;

    let info = build_metadata_info(&snapshot, &calibration, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize metadata info")?;
        println!("{}", json);
    } else {
        print_metadata_info(&info);
    }

    Ok(())
}

fn build_metadata_info(
    snapshot: &MetadataSnapshot,
    calibration: &CalibrationTable,
    args: &InfoArgs,
) -> MetadataInfo {
    let channels = snapshot
        .channels
        .values()
        .map(|channel| {
            let calibration = args
                .calibration
                .then(|| {
                    let raw = calibration.raw(&channel.name)?;
                    let effective = calibration.get(&channel.name)?;
                    let range = value_range(&snapshot.board, raw.gain, raw.offset);
                    Some(CalibrationInfo {
                        gain: raw.gain,
                        offset: raw.offset,
                        delay: effective.delay,
                        range: [range.min, range.max],
                    })
                })
                .flatten();

            ChannelInfo {
                name: channel.name.clone(),
                key: ChannelKey::data(&channel.name).to_string(),
                pin: channel.pin.clone(),
                column: channel.column_index,
                unit: channel.unit.clone(),
                sensor: channel.sensor_name.clone(),
                calibration,
            }
        })
        .collect();

    let sensors = if args.sensors {
        snapshot
            .sensors
            .iter()
            .map(|(name, s)| SensorInfo {
                name: name.clone(),
                gain: s.gain,
                offset: s.offset,
                delay: s.delay,
            })
            .collect()
    } else {
        Vec::new()
    };

    MetadataInfo {
        board: BoardInfo {
            samplerate: snapshot.board.samplerate,
            adc_range: snapshot.board.adc_range,
            differential: snapshot.board.differential,
        },
        delay_baseline: calibration.delay_min(),
        channels,
        sensors,
    }
}

fn print_metadata_info(info: &MetadataInfo) {
    println!("DAQ Channel Set\n");

    println!("Board");
    println!("   ├─ Sample rate: {} Hz", info.board.samplerate);
    println!(
        "   ├─ ADC range: [{}, {}]",
        info.board.adc_range[0], info.board.adc_range[1]
    );
    println!("   ├─ Differential: {}", info.board.differential);
    println!("   └─ Delay baseline: {}", info.delay_baseline);

    println!("\nChannels ({})", info.channels.len());
    for (i, channel) in info.channels.iter().enumerate() {
        let is_last = i == info.channels.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} -> {} (pin {}, column {}, {})",
            prefix, channel.name, channel.key, channel.pin, channel.column, channel.unit
        );
        if let Some(ref sensor) = channel.sensor {
            println!("   {}  ├─ sensor: {}", child_prefix, sensor);
        }
        if let Some(ref cal) = channel.calibration {
            println!(
                "   {}  └─ gain {} offset {} delay {} range [{:.3}, {:.3}]",
                child_prefix, cal.gain, cal.offset, cal.delay, cal.range[0], cal.range[1]
            );
        }
    }

    if !info.sensors.is_empty() {
        println!("\nSensors ({})", info.sensors.len());
        for sensor in &info.sensors {
            println!(
                "   - {}: gain {} offset {} delay {}",
                sensor.name, sensor.gain, sensor.offset, sensor.delay
            );
        }
    }

    println!();
}
