//! Tabular input rows
//!
//! Screen and battery logs arrive as tables with a fixed identifying part
//! (`user`, `device`, `time`, `datetime`) and named value columns. The value
//! column name is caller-configurable, so every non-identifying column is kept
//! by name and looked up at processing time.

use crate::error::ScreenError;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default name of the screen status column (AWARE framework naming)
pub const DEFAULT_SCREEN_COLUMN: &str = "screen_status";

/// Default name of the battery status column (AWARE framework naming)
pub const DEFAULT_BATTERY_COLUMN: &str = "battery_status";

/// One row of a screen or battery table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// User identifier
    pub user: String,
    /// Device identifier
    pub device: String,
    /// Epoch timestamp in milliseconds
    pub time: i64,
    /// Calendar timestamp with the producer's UTC offset; derived from
    /// `time` (as UTC) when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<DateTime<FixedOffset>>,
    /// Remaining named columns (status values and anything else the producer sent)
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl RawRecord {
    /// Create a row at `datetime` with no value columns
    pub fn new(user: &str, device: &str, datetime: impl Into<DateTime<FixedOffset>>) -> Self {
        let datetime = datetime.into();
        Self {
            user: user.to_string(),
            device: device.to_string(),
            time: datetime.timestamp_millis(),
            datetime: Some(datetime),
            columns: Map::new(),
        }
    }

    /// Builder-style column setter
    pub fn with_column(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.columns.insert(name.to_string(), value.into());
        self
    }

    /// Instant of the row
    pub fn timestamp(&self) -> Result<DateTime<Utc>, ScreenError> {
        self.local_timestamp().map(|dt| dt.with_timezone(&Utc))
    }

    /// Timestamp in the producer's local offset (UTC when only `time` is given)
    pub fn local_timestamp(&self) -> Result<DateTime<FixedOffset>, ScreenError> {
        match self.datetime {
            Some(dt) => Ok(dt),
            None => DateTime::from_timestamp_millis(self.time)
                .map(DateTime::<FixedOffset>::from)
                .ok_or_else(|| {
                    ScreenError::Parse(format!("time {} is out of range", self.time))
                }),
        }
    }

    /// Value of `column` coerced to a number
    pub fn numeric(&self, column: &str) -> Result<f64, ScreenError> {
        coerce_numeric(self.columns.get(column), column)
    }
}

/// Coerce a JSON cell to a number.
///
/// Numbers pass through and numeric strings (`"3"`, `" -1.0 "`) are parsed.
/// Anything else, including a missing cell, is a conversion failure.
pub fn coerce_numeric(value: Option<&Value>, column: &str) -> Result<f64, ScreenError> {
    let failure = |shown: String| ScreenError::TypeConversion {
        column: column.to_string(),
        value: shown,
    };

    match value {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| failure(n.to_string())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| failure(format!("{s:?}"))),
        Some(other) => Err(failure(other.to_string())),
        None => Err(failure("<missing>".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_deserialize_row_with_extra_columns() {
        let json = r#"{
            "user": "jd9INuQ5BBlW",
            "device": "3p83yASkOb_B",
            "time": 1580000000000,
            "datetime": "2020-01-26T00:53:20Z",
            "screen_status": 1
        }"#;

        let row: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(row.user, "jd9INuQ5BBlW");
        assert_eq!(row.numeric("screen_status").unwrap(), 1.0);
        assert_eq!(
            row.timestamp().unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 26, 0, 53, 20).unwrap()
        );
    }

    #[test]
    fn test_datetime_derived_from_time() {
        let json = r#"{"user": "u", "device": "d", "time": 60000, "screen_status": 0}"#;
        let row: RawRecord = serde_json::from_str(json).unwrap();
        assert!(row.datetime.is_none());
        assert_eq!(
            row.timestamp().unwrap(),
            Utc.with_ymd_and_hms(1970, 1, 1, 0, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_offset_is_kept() {
        let json = r#"{
            "user": "u",
            "device": "d",
            "time": 1705357800000,
            "datetime": "2024-01-16T01:30:00+03:00",
            "screen_status": 1
        }"#;
        let row: RawRecord = serde_json::from_str(json).unwrap();

        let local = row.local_timestamp().unwrap();
        assert_eq!(local.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(
            row.timestamp().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 22, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_coerce_numeric_strings() {
        assert_eq!(coerce_numeric(Some(&json!("3")), "c").unwrap(), 3.0);
        assert_eq!(coerce_numeric(Some(&json!(" -1 ")), "c").unwrap(), -1.0);
        assert_eq!(coerce_numeric(Some(&json!(2.5)), "c").unwrap(), 2.5);
    }

    #[test]
    fn test_coerce_numeric_failures() {
        assert!(matches!(
            coerce_numeric(Some(&json!("on")), "screen_status"),
            Err(ScreenError::TypeConversion { .. })
        ));
        assert!(coerce_numeric(Some(&json!(true)), "c").is_err());
        assert!(coerce_numeric(Some(&Value::Null), "c").is_err());
        assert!(coerce_numeric(None, "c").is_err());
        assert!(coerce_numeric(Some(&json!("NaN")), "c").is_err());
    }

    #[test]
    fn test_with_column_roundtrip() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let row = RawRecord::new("u1", "d1", at).with_column("battery_status", -2);
        assert_eq!(row.time, at.timestamp_millis());
        assert_eq!(row.numeric("battery_status").unwrap(), -2.0);
    }
}
