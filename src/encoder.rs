//! Report encoding
//!
//! Wraps a feature table in a JSON report carrying producer metadata, so
//! downstream consumers can tell which build computed the features.

use crate::error::ScreenError;
use crate::features::ScreenFeature;
use crate::table::{FeatureRow, FeatureTable};
use crate::{PRODUCER_NAME, SCREEN_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "screen.features.v1";

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Serialized feature table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    /// Features that were requested, in computation order
    pub features: Vec<String>,
    /// Table columns, in output order
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

/// Encoder for feature reports
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn encode(&self, table: &FeatureTable, features: &[ScreenFeature]) -> FeatureReport {
        FeatureReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: SCREEN_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            features: features.iter().map(|f| f.name().to_string()).collect(),
            columns: table.columns().to_vec(),
            rows: table.to_rows(),
        }
    }

    /// Encode to a pretty-printed JSON string
    pub fn encode_to_json(
        &self,
        table: &FeatureTable,
        features: &[ScreenFeature],
    ) -> Result<String, ScreenError> {
        let report = self.encode(table, features);
        serde_json::to_string_pretty(&report).map_err(|e| ScreenError::Encoding(e.to_string()))
    }

    /// Encode rows only, one JSON object per line
    pub fn encode_rows_ndjson(&self, table: &FeatureTable) -> Result<String, ScreenError> {
        let mut out = String::new();
        for row in table.to_rows() {
            let line = serde_json::to_string(&row).map_err(|e| ScreenError::Encoding(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FeatureValue, WindowKey};
    use chrono::{DateTime, TimeZone};

    fn sample_table() -> FeatureTable {
        let at: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let mut table = FeatureTable::new();
        table.insert(WindowKey::new("u1", at), "screen_on_count", FeatureValue::Number(3.0));
        table.insert(WindowKey::new("u2", at), "screen_on_count", FeatureValue::Number(1.0));
        table
    }

    #[test]
    fn test_encode_report() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let json = encoder
            .encode_to_json(&sample_table(), &[ScreenFeature::Count])
            .unwrap();

        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["report_version"], REPORT_VERSION);
        assert_eq!(report["producer"]["name"], "synheart-screen");
        assert_eq!(report["producer"]["instance_id"], "test-instance");
        assert_eq!(report["features"][0], "screen_count");
        assert_eq!(report["columns"][0], "screen_on_count");
        assert_eq!(report["rows"][0]["user"], "u1");
        assert_eq!(report["rows"][0]["window_start"], "2024-01-15T08:00:00Z");
        assert_eq!(report["rows"][0]["values"]["screen_on_count"], 3.0);
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = ReportEncoder::new().encode(&FeatureTable::new(), &[]);
        let b = ReportEncoder::new().encode(&FeatureTable::new(), &[]);
        assert_ne!(a.producer.instance_id, b.producer.instance_id);
    }

    #[test]
    fn test_encode_rows_ndjson() {
        let ndjson = ReportEncoder::new().encode_rows_ndjson(&sample_table()).unwrap();
        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["user"], "u2");
    }
}
