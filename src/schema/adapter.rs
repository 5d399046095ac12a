//! Adapter for reading screen and battery tables
//!
//! Tables are exchanged as a JSON array of row objects or as NDJSON (one row
//! object per line). Shape errors are reported before any row is decoded.

use crate::error::ScreenError;
use crate::schema::raw_record::RawRecord;
use serde::Serialize;
use serde_json::Value;

/// Adapter for converting serialized tables to rows
pub struct TableAdapter;

impl TableAdapter {
    /// Parse a JSON string containing an array of row objects
    pub fn parse_array(json: &str) -> Result<Vec<RawRecord>, ScreenError> {
        let document: Value = serde_json::from_str(json)?;
        let rows = match document {
            Value::Array(rows) => rows,
            other => {
                return Err(ScreenError::InputType(format!(
                    "expected a table (array of rows), got {}",
                    json_kind(&other)
                )))
            }
        };

        rows.into_iter()
            .enumerate()
            .map(|(index, row)| decode_row(row, index + 1))
            .collect()
    }

    /// Parse NDJSON (newline-delimited JSON) containing one row per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawRecord>, ScreenError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row: Value = serde_json::from_str(trimmed).map_err(|e| {
                ScreenError::Parse(format!("Failed to parse line {}: {}", line_num + 1, e))
            })?;
            records.push(decode_row(row, line_num + 1)?);
        }
        Ok(records)
    }

    /// Check that every row carries a numeric-coercible value in `column`
    pub fn validate_column(records: &[RawRecord], column: &str) -> ColumnReport {
        let mut report = ColumnReport {
            column: column.to_string(),
            total_rows: records.len(),
            valid_rows: 0,
            errors: Vec::new(),
        };

        for (index, record) in records.iter().enumerate() {
            match record.numeric(column) {
                Ok(_) => report.valid_rows += 1,
                Err(e) => report.errors.push(RowError {
                    row: index + 1,
                    message: e.to_string(),
                }),
            }
        }

        report
    }
}

/// Result of checking one column of a table
#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    pub column: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<RowError>,
}

impl ColumnReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A row that failed a column check (1-based row number)
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

fn decode_row(row: Value, position: usize) -> Result<RawRecord, ScreenError> {
    if !row.is_object() {
        return Err(ScreenError::InputType(format!(
            "row {} is {}, expected an object",
            position,
            json_kind(&row)
        )));
    }
    serde_json::from_value(row)
        .map_err(|e| ScreenError::Parse(format!("Invalid row {}: {}", position, e)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
