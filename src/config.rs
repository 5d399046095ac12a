//! Per-feature configuration
//!
//! Every metric accepts the same configuration object. All fields are
//! optional in JSON and fall back to AWARE defaults.

use crate::error::ScreenError;
use crate::schema::{DEFAULT_BATTERY_COLUMN, DEFAULT_SCREEN_COLUMN};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default resampling rule (30 minute windows)
pub const DEFAULT_RESAMPLE_RULE: &str = "30T";

/// Configuration shared by all screen metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Column of the screen table holding the status code
    pub screen_column_name: String,
    /// Column of the battery table holding the battery status
    pub battery_column_name: String,
    /// Windowing parameters
    pub resample_args: ResampleArgs,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            screen_column_name: DEFAULT_SCREEN_COLUMN.to_string(),
            battery_column_name: DEFAULT_BATTERY_COLUMN.to_string(),
            resample_args: ResampleArgs::default(),
        }
    }
}

impl ScreenConfig {
    /// Build a configuration from a JSON mapping.
    ///
    /// Non-mapping values are rejected with `InputType`. Unknown top-level
    /// keys are ignored with a warning; unknown `resample_args` keys are
    /// rejected since they would change the windows.
    pub fn from_value(value: &Value) -> Result<Self, ScreenError> {
        let map = value.as_object().ok_or_else(|| {
            ScreenError::InputType("feature configuration is not a mapping".to_string())
        })?;

        warn_unknown_keys(
            map,
            &["screen_column_name", "battery_column_name", "resample_args"],
            "feature configuration",
        );

        let config: ScreenConfig = serde_json::from_value(value.clone())
            .map_err(|e| ScreenError::InvalidConfig(e.to_string()))?;
        config.resample_args.rule()?;
        Ok(config)
    }

    /// Same configuration with a different resampling rule
    pub fn with_rule(mut self, rule: &str) -> Self {
        self.resample_args.rule = rule.to_string();
        self
    }
}

fn warn_unknown_keys(map: &Map<String, Value>, known: &[&str], context: &str) {
    for key in map.keys().filter(|k| !known.contains(&k.as_str())) {
        log::warn!("ignoring unknown key '{}' in {}", key, context);
    }
}

/// Windowing parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResampleArgs {
    /// Window length as a pandas-style offset alias ("30T", "1H", "1D", "1h30min")
    pub rule: String,
    /// Shift of the window edges ("15min", "-1H")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    /// Edge anchor: "start_day" (default), "epoch" or "start"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Default for ResampleArgs {
    fn default() -> Self {
        Self {
            rule: DEFAULT_RESAMPLE_RULE.to_string(),
            offset: None,
            origin: None,
        }
    }
}

impl ResampleArgs {
    /// Parsed window rule
    pub fn rule(&self) -> Result<ResampleRule, ScreenError> {
        let mut rule = ResampleRule::parse(&self.rule)?;
        if let Some(offset) = &self.offset {
            rule = rule.with_offset(parse_offset(offset)?);
        }
        if let Some(origin) = &self.origin {
            rule = rule.with_origin(WindowOrigin::parse(origin)?);
        }
        Ok(rule)
    }
}

/// Where window edges are anchored, in the producer's local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowOrigin {
    /// 1970-01-01 00:00
    Epoch,
    /// Midnight of the day of the user's first observation
    #[default]
    StartDay,
    /// The user's first observation
    Start,
}

impl WindowOrigin {
    pub fn parse(origin: &str) -> Result<Self, ScreenError> {
        match origin.trim() {
            "epoch" => Ok(WindowOrigin::Epoch),
            "start_day" => Ok(WindowOrigin::StartDay),
            "start" => Ok(WindowOrigin::Start),
            other => Err(ScreenError::InvalidConfig(format!(
                "unsupported resample origin '{other}'"
            ))),
        }
    }
}

/// Fixed-length window grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResampleRule {
    step: Duration,
    offset: Duration,
    origin: WindowOrigin,
}

impl ResampleRule {
    /// One calendar day
    pub fn daily() -> Self {
        Self {
            step: Duration::days(1),
            offset: Duration::zero(),
            origin: WindowOrigin::StartDay,
        }
    }

    pub fn from_duration(step: Duration) -> Result<Self, ScreenError> {
        if step <= Duration::zero() {
            return Err(ScreenError::InvalidConfig(format!(
                "window length must be positive, got {step}"
            )));
        }
        Ok(Self {
            step,
            ..Self::daily()
        })
    }

    /// Parse a rule such as `30T`, `30min`, `2H`, `1D`, `1W`, `100ms`, `1h30min`
    /// or `30 minutes`. A missing multiple means 1.
    pub fn parse(rule: &str) -> Result<Self, ScreenError> {
        let step = parse_span(rule)
            .ok_or_else(|| ScreenError::InvalidConfig(format!("invalid resample rule '{rule}'")))?;
        Self::from_duration(step)
    }

    /// Same grid shifted by `offset`
    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_origin(mut self, origin: WindowOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Window length
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Window length in milliseconds
    pub fn step_millis(&self) -> i64 {
        self.step.num_milliseconds()
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }

    pub fn origin(&self) -> WindowOrigin {
        self.origin
    }
}

/// Sum of `<multiple><unit>` terms; `None` on anything else
fn parse_span(text: &str) -> Option<Duration> {
    let mut rest = text.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(digits_end);
        let multiple: i32 = if digits.is_empty() {
            1
        } else {
            digits.parse().ok()?
        };

        let tail = tail.trim_start();
        let unit_end = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        total = total.checked_add(&unit_span(unit)?.checked_mul(multiple)?)?;
        rest = tail.trim_start();
    }
    Some(total)
}

fn unit_span(unit: &str) -> Option<Duration> {
    let span = match unit {
        "L" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => {
            Duration::milliseconds(1)
        }
        "S" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::seconds(1),
        "T" | "min" | "mins" | "minute" | "minutes" => Duration::minutes(1),
        "H" | "h" | "hour" | "hours" => Duration::hours(1),
        "D" | "d" | "day" | "days" => Duration::days(1),
        "W" | "w" | "week" | "weeks" => Duration::weeks(1),
        _ => return None,
    };
    Some(span)
}

/// Signed span such as `15min` or `-1H`
fn parse_offset(offset: &str) -> Result<Duration, ScreenError> {
    let trimmed = offset.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let span = parse_span(body).ok_or_else(|| {
        ScreenError::InvalidConfig(format!("invalid resample offset '{offset}'"))
    })?;
    Ok(if negative { -span } else { span })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = ScreenConfig::default();
        assert_eq!(config.screen_column_name, "screen_status");
        assert_eq!(config.battery_column_name, "battery_status");
        assert_eq!(config.resample_args.rule, "30T");
    }

    #[test]
    fn test_from_value_partial() {
        let config = ScreenConfig::from_value(&json!({"resample_args": {"rule": "1H"}})).unwrap();
        assert_eq!(config.screen_column_name, "screen_status");
        assert_eq!(config.resample_args.rule().unwrap().step(), Duration::hours(1));

        let config = ScreenConfig::from_value(&json!({})).unwrap();
        assert_eq!(config, ScreenConfig::default());
    }

    #[test]
    fn test_from_value_rejects_non_mapping() {
        let result = ScreenConfig::from_value(&json!(["screen_status"]));
        assert!(matches!(result, Err(ScreenError::InputType(_))));
    }

    #[test]
    fn test_from_value_rejects_bad_rule() {
        let result = ScreenConfig::from_value(&json!({"resample_args": {"rule": "fortnight"}}));
        assert!(matches!(result, Err(ScreenError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_rules() {
        let cases = [
            ("30T", Duration::minutes(30)),
            ("30min", Duration::minutes(30)),
            ("30 minutes", Duration::minutes(30)),
            ("1H", Duration::hours(1)),
            ("h", Duration::hours(1)),
            ("1D", Duration::days(1)),
            ("D", Duration::days(1)),
            ("10S", Duration::seconds(10)),
        ];
        for (rule, step) in cases {
            assert_eq!(ResampleRule::parse(rule).unwrap().step(), step, "rule {rule}");
        }
    }

    #[test]
    fn test_parse_weeks_millis_and_compound_rules() {
        let cases = [
            ("1W", Duration::weeks(1)),
            ("2w", Duration::weeks(2)),
            ("100ms", Duration::milliseconds(100)),
            ("250L", Duration::milliseconds(250)),
            ("1h30min", Duration::minutes(90)),
            ("1D2H", Duration::hours(26)),
            ("1 hour 15 minutes", Duration::minutes(75)),
        ];
        for (rule, step) in cases {
            assert_eq!(ResampleRule::parse(rule).unwrap().step(), step, "rule {rule}");
        }
    }

    #[test]
    fn test_parse_invalid_rules() {
        for rule in ["", "0T", "30X", "-5T", "T30", "1h30", "1M"] {
            assert!(ResampleRule::parse(rule).is_err(), "rule {rule:?}");
        }
    }

    #[test]
    fn test_offset_and_origin() {
        let config = ScreenConfig::from_value(&json!({
            "resample_args": {"rule": "1H", "offset": "15min", "origin": "epoch"}
        }))
        .unwrap();
        let rule = config.resample_args.rule().unwrap();
        assert_eq!(rule.offset(), Duration::minutes(15));
        assert_eq!(rule.origin(), WindowOrigin::Epoch);

        let args = ResampleArgs {
            offset: Some("-1H".to_string()),
            ..ResampleArgs::default()
        };
        assert_eq!(args.rule().unwrap().offset(), Duration::hours(-1));
        assert_eq!(args.rule().unwrap().origin(), WindowOrigin::StartDay);
    }

    #[test]
    fn test_unsupported_resample_args_rejected() {
        for args in [
            json!({"rule": "1H", "closed": "right"}),
            json!({"rule": "1H", "origin": "end"}),
            json!({"rule": "1H", "offset": "soon"}),
        ] {
            let result = ScreenConfig::from_value(&json!({ "resample_args": args }));
            assert!(matches!(result, Err(ScreenError::InvalidConfig(_))), "{args}");
        }
    }

    #[test]
    fn test_unknown_top_level_key_is_ignored() {
        let config = ScreenConfig::from_value(&json!({"colour": "blue"})).unwrap();
        assert_eq!(config, ScreenConfig::default());
    }
}
