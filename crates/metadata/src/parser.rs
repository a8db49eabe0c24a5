//! Metadata document parsing
//!
//! Walks the JSON document section by section so every failure names the
//! exact field path (`daq_info.channel.U1.gain`).
//!
//! Layout:
//! - `daq_info.board.{samplerate, adc_range, differential}`
//! - `daq_info.channel.<name>.{ai_pin, gain, offset, delay, unit, sensor?}`
//! - `daq_info.sensor.<name>.{gain, offset, delay}` (optional section)
//! - `data_columns.<pin>` -> column index

use std::collections::BTreeMap;

use contracts::{
    BoardDescriptor, ChannelDescriptor, ContractError, MetadataSnapshot, SensorDescriptor,
};
use serde_json::{Map, Value};
use tracing::debug;

pub(crate) const DAQ_INFO: &str = "daq_info";
const DATA_COLUMNS: &str = "data_columns";
const PIN_KEYS: [&str; 2] = ["ai_pin", "pin"];

type Result<T> = std::result::Result<T, ContractError>;

/// Decode the raw payload into a JSON document
pub(crate) fn decode(payload: &[u8]) -> Result<Value> {
    serde_json::from_slice(payload)
        .map_err(|e| ContractError::metadata_parse("<document>", format!("invalid JSON: {e}")))
}

/// Parse a decoded document into a snapshot
pub(crate) fn parse_document(doc: &Value) -> Result<MetadataSnapshot> {
    let root = Section::root(doc)?;
    let daq_info = root.section(DAQ_INFO)?;

    let board = parse_board(&daq_info.section("board")?)?;
    let sensors = match daq_info.optional_section("sensor")? {
        Some(section) => parse_sensors(&section)?,
        None => BTreeMap::new(),
    };
    let data_columns = root.section(DATA_COLUMNS)?;
    let channels = parse_channels(&daq_info.section("channel")?, &data_columns, &sensors)?;

    debug!(
        samplerate = board.samplerate,
        differential = board.differential,
        channels = channels.len(),
        sensors = sensors.len(),
        "metadata parsed"
    );

    Ok(MetadataSnapshot {
        board,
        channels,
        sensors,
        daq_info: daq_info.to_value(),
    })
}

fn parse_board(section: &Section<'_>) -> Result<BoardDescriptor> {
    let samplerate = section.number("samplerate")?;
    if !(samplerate.is_finite() && samplerate > 0.0) {
        return Err(ContractError::metadata_parse(
            section.field("samplerate"),
            format!("samplerate must be > 0, got {samplerate}"),
        ));
    }

    Ok(BoardDescriptor {
        samplerate,
        adc_range: section.pair("adc_range")?,
        differential: section.boolean("differential")?,
    })
}

fn parse_sensors(section: &Section<'_>) -> Result<BTreeMap<String, SensorDescriptor>> {
    let mut sensors = BTreeMap::new();
    for name in section.keys() {
        let sensor = section.section(name)?;
        sensors.insert(
            name.clone(),
            SensorDescriptor {
                gain: sensor.number("gain")?,
                offset: sensor.number("offset")?,
                delay: sensor.integer("delay")?,
            },
        );
    }
    Ok(sensors)
}

fn parse_channels(
    section: &Section<'_>,
    data_columns: &Section<'_>,
    sensors: &BTreeMap<String, SensorDescriptor>,
) -> Result<BTreeMap<String, ChannelDescriptor>> {
    let channel_count = section.len();
    let mut channels = BTreeMap::new();

    for name in section.keys() {
        let channel = section.section(name)?;
        let pin = channel.pin()?;

        let column = data_columns.integer(&pin)?;
        if column < 0 || column as usize >= channel_count {
            return Err(ContractError::metadata_parse(
                data_columns.field(&pin),
                format!("column index {column} outside [0, {channel_count})"),
            ));
        }

        let sensor_name = channel.optional_string("sensor")?;
        if let Some(sensor) = sensor_name.as_deref() {
            if !sensors.contains_key(sensor) {
                return Err(ContractError::metadata_parse(
                    channel.field("sensor"),
                    format!("unknown sensor '{sensor}'"),
                ));
            }
        }

        channels.insert(
            name.clone(),
            ChannelDescriptor {
                name: name.clone(),
                pin,
                column_index: column as usize,
                unit: channel.string("unit")?,
                gain: channel.number("gain")?,
                offset: channel.number("offset")?,
                delay: channel.integer("delay")?,
                sensor_name,
            },
        );
    }

    Ok(channels)
}

/// JSON object with its dotted path, for field-level errors
struct Section<'a> {
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
    fn root(doc: &'a Value) -> Result<Self> {
        let map = doc
            .as_object()
            .ok_or_else(|| ContractError::metadata_parse("<document>", "expected object"))?;
        Ok(Self {
            path: String::new(),
            map,
        })
    }

    fn field(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn keys(&self) -> impl Iterator<Item = &'a String> {
        self.map.keys()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn to_value(&self) -> Value {
        Value::Object(self.map.clone())
    }

    fn get(&self, key: &str) -> Result<&'a Value> {
        match self.map.get(key) {
            Some(Value::Null) | None => Err(ContractError::metadata_parse(
                self.field(key),
                "missing required field",
            )),
            Some(value) => Ok(value),
        }
    }

    fn mismatch(&self, key: &str, expected: &str, got: &Value) -> ContractError {
        ContractError::metadata_parse(
            self.field(key),
            format!("expected {expected}, got {}", type_name(got)),
        )
    }

    fn section(&self, key: &str) -> Result<Section<'a>> {
        let value = self.get(key)?;
        let map = value
            .as_object()
            .ok_or_else(|| self.mismatch(key, "object", value))?;
        Ok(Section {
            path: self.field(key),
            map,
        })
    }

    fn optional_section(&self, key: &str) -> Result<Option<Section<'a>>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.section(key).map(Some),
        }
    }

    fn number(&self, key: &str) -> Result<f64> {
        let value = self.get(key)?;
        value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.mismatch(key, "number", value))
    }

    fn integer(&self, key: &str) -> Result<i64> {
        let value = self.get(key)?;
        value
            .as_i64()
            .ok_or_else(|| self.mismatch(key, "integer", value))
    }

    fn boolean(&self, key: &str) -> Result<bool> {
        let value = self.get(key)?;
        value
            .as_bool()
            .ok_or_else(|| self.mismatch(key, "bool", value))
    }

    fn string(&self, key: &str) -> Result<String> {
        let value = self.get(key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.mismatch(key, "string", value))
    }

    fn optional_string(&self, key: &str) -> Result<Option<String>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(key).map(Some),
        }
    }

    fn pair(&self, key: &str) -> Result<[f64; 2]> {
        let value = self.get(key)?;
        match value.as_array().map(Vec::as_slice) {
            Some([lo, hi]) => match (lo.as_f64(), hi.as_f64()) {
                (Some(lo), Some(hi)) => Ok([lo, hi]),
                _ => Err(ContractError::metadata_parse(
                    self.field(key),
                    "expected two numbers",
                )),
            },
            Some(items) => Err(ContractError::metadata_parse(
                self.field(key),
                format!("expected two elements, got {}", items.len()),
            )),
            None => Err(self.mismatch(key, "array", value)),
        }
    }

    /// Pin identifier, string or integer, under `ai_pin` (or `pin`)
    fn pin(&self) -> Result<String> {
        let key = PIN_KEYS
            .iter()
            .copied()
            .find(|k| self.map.contains_key(*k))
            .unwrap_or(PIN_KEYS[0]);
        let value = self.get(key)?;
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            other => Err(self.mismatch(key, "pin identifier", other)),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
