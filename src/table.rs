//! Result table
//!
//! Feature output indexed by (user, window start) with one named column per
//! metric. Cells are absent where a metric had no data for that window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row index of a feature table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowKey {
    pub user: String,
    pub window_start: DateTime<Utc>,
}

impl WindowKey {
    pub fn new(user: &str, window_start: DateTime<Utc>) -> Self {
        Self {
            user: user.to_string(),
            window_start,
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Timestamp(_) => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FeatureValue::Timestamp(dt) => Some(*dt),
            FeatureValue::Number(_) => None,
        }
    }
}

/// One serialized row of a feature table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub user: String,
    pub window_start: DateTime<Utc>,
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// Column-oriented feature table keyed by (user, window start)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: BTreeMap<WindowKey, BTreeMap<String, FeatureValue>>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a column; columns keep their declaration order
    pub fn add_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    /// Set a cell, declaring the column if needed
    pub fn insert(&mut self, key: WindowKey, column: &str, value: FeatureValue) {
        self.add_column(column);
        self.rows
            .entry(key)
            .or_default()
            .insert(column.to_string(), value);
    }

    /// Add a whole column from resampled numeric values
    pub fn insert_column(&mut self, column: &str, values: Vec<(WindowKey, f64)>) {
        self.add_column(column);
        for (key, value) in values {
            self.insert(key, column, FeatureValue::Number(value));
        }
    }

    pub fn get(&self, user: &str, window_start: DateTime<Utc>, column: &str) -> Option<FeatureValue> {
        self.rows
            .get(&WindowKey::new(user, window_start))
            .and_then(|cells| cells.get(column))
            .copied()
    }

    /// Values of one column in row order
    pub fn column(&self, column: &str) -> Vec<(&WindowKey, FeatureValue)> {
        self.rows
            .iter()
            .filter_map(|(key, cells)| cells.get(column).map(|v| (key, *v)))
            .collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> impl Iterator<Item = &WindowKey> {
        self.rows.keys()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column-wise concatenation (outer join on the row index).
    ///
    /// Columns of `other` are appended after ours; a cell present in both
    /// tables takes the value from `other`.
    pub fn concat(mut self, other: FeatureTable) -> FeatureTable {
        for column in &other.columns {
            self.add_column(column);
        }
        for (key, cells) in other.rows {
            self.rows.entry(key).or_default().extend(cells);
        }
        self
    }

    /// Rows in index order with cells in column order
    pub fn to_rows(&self) -> Vec<FeatureRow> {
        self.rows
            .iter()
            .map(|(key, cells)| {
                let mut values = serde_json::Map::new();
                for column in &self.columns {
                    if let Some(value) = cells.get(column) {
                        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                        values.insert(column.clone(), json);
                    }
                }
                FeatureRow {
                    user: key.user.clone(),
                    window_start: key.window_start,
                    values,
                }
            })
            .collect()
    }
}
