//! Reads CSV and JSON entity files into ordered, in-memory records.

use std::path::Path;

use serde_json::{Map, Value};

use crate::errors::ReadError;
use crate::value::shape_of;

/// One input row or object: field name to raw value, in source order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Picks the format from the file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            _ => None,
        }
    }
}

/// Reads the whole file at `path` into records.
pub async fn read_records(path: &Path) -> Result<Vec<Record>, ReadError> {
    let display = path.display().to_string();
    let format = InputFormat::from_path(path)
        .ok_or_else(|| ReadError::UnsupportedFormat(display.clone()))?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ReadError::Io {
            path: display.clone(),
            source,
        })?;

    match format {
        InputFormat::Csv => parse_csv(&display, &content),
        InputFormat::Json => parse_json(&display, &content),
    }
}

/// Parses CSV text with a mandatory header row. Empty cells are left out of
/// the record.
pub fn parse_csv(path: &str, content: &str) -> Result<Vec<Record>, ReadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| csv_failure(path, err))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| csv_failure(path, err))?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn csv_failure(path: &str, err: csv::Error) -> ReadError {
    let line = err.position().map(|pos| pos.line());
    let message = match line {
        Some(line) => format!("line {line}: {err}"),
        None => err.to_string(),
    };
    ReadError::ParseFailed {
        path: path.to_string(),
        line,
        message,
    }
}

/// Parses a JSON object (one record) or an array of objects.
pub fn parse_json(path: &str, content: &str) -> Result<Vec<Record>, ReadError> {
    let parsed: Value = serde_json::from_str(content).map_err(|err| ReadError::ParseFailed {
        path: path.to_string(),
        line: Some(err.line() as u64),
        message: format!("line {}, column {}: {err}", err.line(), err.column()),
    })?;

    match parsed {
        Value::Object(record) => Ok(vec![record]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(ReadError::NotAnObject {
                    path: path.to_string(),
                    index,
                    found: shape_of(&other),
                }),
            })
            .collect(),
        other => Err(ReadError::NotAnObject {
            path: path.to_string(),
            index: 0,
            found: shape_of(&other),
        }),
    }
}
