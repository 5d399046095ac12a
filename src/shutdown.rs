//! Shutdown extraction from battery logs
//!
//! The AWARE battery sensor reports shutdown and reboot as negative pseudo
//! levels. Those readings are the only evidence that the screen sensor was
//! silent because the phone was off.

use crate::error::ScreenError;
use crate::schema::RawRecord;
use crate::types::ShutdownEvent;
use chrono::Utc;

/// Exclusive lower bound of shutdown levels
const SHUTDOWN_LEVEL_LOW: f64 = -3.0;

/// Exclusive upper bound of shutdown levels
const SHUTDOWN_LEVEL_HIGH: f64 = 0.0;

/// True when a battery level denotes a shutdown or reboot (`-3 < level < 0`)
pub fn is_shutdown_level(level: f64) -> bool {
    level > SHUTDOWN_LEVEL_LOW && level < SHUTDOWN_LEVEL_HIGH
}

/// Extract shutdown/reboot readings from a battery table.
///
/// Every value of `column` must coerce to a number, otherwise the whole
/// extraction fails with `TypeConversion`.
pub fn extract_shutdowns(
    battery: &[RawRecord],
    column: &str,
) -> Result<Vec<ShutdownEvent>, ScreenError> {
    let mut shutdowns = Vec::new();

    for record in battery {
        let level = record.numeric(column)?;
        if !is_shutdown_level(level) {
            continue;
        }
        let local = record.local_timestamp()?;
        shutdowns.push(ShutdownEvent {
            user: record.user.clone(),
            device: record.device.clone(),
            time: record.time,
            datetime: local.with_timezone(&Utc),
            utc_offset_sec: local.offset().local_minus_utc(),
            level,
        });
    }

    Ok(shutdowns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn battery_row(minute: i64, level: serde_json::Value) -> RawRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap() + Duration::minutes(minute);
        RawRecord::new("u1", "d1", at).with_column("battery_status", level)
    }

    #[test]
    fn test_shutdown_level_bounds() {
        assert!(is_shutdown_level(-1.0));
        assert!(is_shutdown_level(-2.0));
        assert!(is_shutdown_level(-2.5));
        assert!(!is_shutdown_level(0.0));
        assert!(!is_shutdown_level(-3.0));
        assert!(!is_shutdown_level(1.0));
        assert!(!is_shutdown_level(-4.0));
    }

    #[test]
    fn test_extract_keeps_only_shutdowns() {
        let battery = vec![
            battery_row(0, 87.into()),
            battery_row(1, (-1).into()),
            battery_row(2, "-2".into()),
            battery_row(3, (-3).into()),
            battery_row(4, 0.into()),
        ];

        let shutdowns = extract_shutdowns(&battery, "battery_status").unwrap();
        let levels: Vec<f64> = shutdowns.iter().map(|s| s.level).collect();
        assert_eq!(levels, vec![-1.0, -2.0]);
        assert_eq!(shutdowns[0].datetime, battery[1].timestamp().unwrap());
    }

    #[test]
    fn test_extract_fails_on_non_numeric() {
        let battery = vec![battery_row(0, 50.into()), battery_row(1, "charging".into())];
        let result = extract_shutdowns(&battery, "battery_status");
        assert!(matches!(result, Err(ScreenError::TypeConversion { .. })));
    }

    #[test]
    fn test_extract_empty_table() {
        assert!(extract_shutdowns(&[], "battery_status").unwrap().is_empty());
    }
}
