use crate::data::record::{DataType, DataValue};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// One loaded row, keyed by column name
pub type RecordRow = BTreeMap<String, DataValue>;

/// Rows to infer column types from
const TYPE_SAMPLE_SIZE: usize = 100;

/// Records read from a file plus their columns in display order
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub columns: Vec<String>,
    pub records: Vec<RecordRow>,
}

impl LoadedRecords {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a `.json` or `.csv` file, picking the loader from the extension
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<LoadedRecords> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => load_json(path),
        Some("csv") => load_csv(path),
        _ => bail!(
            "Unsupported file type: {} (expected .json or .csv)",
            path.display()
        ),
    }
}

/// Load a CSV file. Column types are inferred by sampling the first rows.
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<LoadedRecords> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path.as_ref()))?;
    let loaded = read_csv(file)?;
    info!(
        target: "loader",
        "Loaded {} records with {} columns from {}",
        loaded.len(),
        loaded.columns.len(),
        path.as_ref().display()
    );
    Ok(loaded)
}

/// Parse CSV with a header row from any reader
pub fn read_csv<R: Read>(reader: R) -> Result<LoadedRecords> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let columns: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut string_rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Malformed CSV record {}", line + 1))?;
        string_rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    let mut column_types = vec![DataType::Null; columns.len()];
    for row in string_rows.iter().take(TYPE_SAMPLE_SIZE) {
        for (col_idx, value) in row.iter().enumerate().take(columns.len()) {
            if !value.is_empty() {
                let inferred = DataType::infer_from_string(value);
                column_types[col_idx] = column_types[col_idx].merge(&inferred);
            }
        }
    }
    debug!(target: "loader", "Inferred CSV column types: {:?}", column_types);

    let records = string_rows
        .into_iter()
        .map(|row| {
            columns
                .iter()
                .zip(column_types.iter())
                .enumerate()
                .map(|(col_idx, (name, data_type))| {
                    let value = match row.get(col_idx) {
                        Some(raw) if !raw.is_empty() => DataValue::from_string(raw, data_type),
                        _ => DataValue::Null,
                    };
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();

    Ok(LoadedRecords { columns, records })
}

/// Load a JSON file holding an array of objects or `{"data": [...]}`
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<LoadedRecords> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open JSON file: {:?}", path.as_ref()))?;
    let json: JsonValue = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON file: {:?}", path.as_ref()))?;
    let loaded = records_from_json(json)?;
    info!(
        target: "loader",
        "Loaded {} records with {} columns from {}",
        loaded.len(),
        loaded.columns.len(),
        path.as_ref().display()
    );
    Ok(loaded)
}

/// Convert already parsed JSON into records.
///
/// Columns are the keys of the first object followed by keys first seen later.
pub fn records_from_json(json: JsonValue) -> Result<LoadedRecords> {
    let items = match json {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut obj) => match obj.remove("data") {
            Some(JsonValue::Array(items)) => items,
            _ => bail!("JSON object must carry a \"data\" array"),
        },
        _ => bail!("JSON data must be an array of objects"),
    };

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let JsonValue::Object(obj) = item else {
            bail!("JSON item {} is not an object", idx);
        };

        let mut row = RecordRow::new();
        for (key, value) in obj {
            if !columns.contains(&key) {
                columns.push(key.clone());
            }
            row.insert(key, DataValue::from_json(&value));
        }
        records.push(row);
    }

    Ok(LoadedRecords { columns, records })
}
