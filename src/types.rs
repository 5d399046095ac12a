//! Core types for the Synheart Screen pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: timeline events, classified transitions and timed transitions.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen status codes as reported by the AWARE screen sensor
pub mod status {
    pub const OFF: i64 = 0;
    pub const ON: i64 = 1;
    pub const LOCKED: i64 = 2;
    pub const UNLOCKED: i64 = 3;
}

/// Where a timeline event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Reported by the screen sensor
    Screen,
    /// Synthesized from a battery shutdown/reboot reading
    Shutdown,
}

/// A battery reading that marks a shutdown or reboot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutdownEvent {
    pub user: String,
    pub device: String,
    /// Epoch timestamp in milliseconds
    pub time: i64,
    pub datetime: DateTime<Utc>,
    /// Producer's UTC offset in seconds
    pub utc_offset_sec: i32,
    /// Raw battery level (-1 or -2 for integer-coded logs)
    pub level: f64,
}

/// One event of the merged screen timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenEvent {
    pub user: String,
    pub device: String,
    /// Epoch timestamp in milliseconds
    pub time: i64,
    pub datetime: DateTime<Utc>,
    /// Producer's UTC offset in seconds; local calendar days follow it
    #[serde(default)]
    pub utc_offset_sec: i32,
    /// Screen status after numeric coercion
    pub status: f64,
    pub source: EventSource,
}

impl ScreenEvent {
    /// Integer status code (truncated, as used in pair codes)
    pub fn status_code(&self) -> i64 {
        self.status as i64
    }

    /// The event's instant in the producer's local offset
    pub fn local_datetime(&self) -> DateTime<FixedOffset> {
        match FixedOffset::east_opt(self.utc_offset_sec) {
            Some(offset) => self.datetime.with_timezone(&offset),
            None => DateTime::<FixedOffset>::from(self.datetime),
        }
    }
}

/// Semantic label of a transition between two consecutive screen events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Screen turned on
    On,
    /// Screen turned off
    Off,
    /// Phone in use (unlocked until the next event)
    Use,
    /// Ambiguous lock sequence, counted nowhere
    Irrelevant,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::On => "on",
            TransitionKind::Off => "off",
            TransitionKind::Use => "use",
            TransitionKind::Irrelevant => "irrelevant",
        }
    }
}

/// Ordered pair of (current status, next status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairCode {
    pub from: i64,
    pub to: i64,
}

impl PairCode {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Look the pair up in the transition table
    pub fn classify(&self) -> Option<TransitionKind> {
        use status::*;

        match (self.from, self.to) {
            (UNLOCKED, OFF) | (UNLOCKED, ON) | (UNLOCKED, LOCKED) => Some(TransitionKind::Use),
            (ON, OFF) | (ON, LOCKED) | (ON, UNLOCKED) | (LOCKED, OFF) => Some(TransitionKind::On),
            // 2 -> 1 and 2 -> 3 show up when the screen goes off and locks afterwards
            (LOCKED, ON) | (LOCKED, UNLOCKED) => Some(TransitionKind::Irrelevant),
            (OFF, ON) | (OFF, LOCKED) | (OFF, UNLOCKED) => Some(TransitionKind::Off),
            _ => None,
        }
    }
}

impl fmt::Display for PairCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)
    }
}

/// A timeline event labelled with the transition to its successor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub event: ScreenEvent,
    pub pair: PairCode,
    pub kind: Option<TransitionKind>,
    /// Datetime of the event this one was paired with
    pub next_datetime: DateTime<Utc>,
}

impl ClassifiedEvent {
    pub fn is(&self, kind: TransitionKind) -> bool {
        self.kind == Some(kind)
    }
}

/// A classified transition with its duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedTransition {
    pub transition: ClassifiedEvent,
    /// Seconds until the next event of the same user
    pub duration_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        let expected = [
            ((3, 0), Some(TransitionKind::Use)),
            ((3, 1), Some(TransitionKind::Use)),
            ((3, 2), Some(TransitionKind::Use)),
            ((1, 0), Some(TransitionKind::On)),
            ((1, 2), Some(TransitionKind::On)),
            ((1, 3), Some(TransitionKind::On)),
            ((2, 0), Some(TransitionKind::On)),
            ((2, 1), Some(TransitionKind::Irrelevant)),
            ((2, 3), Some(TransitionKind::Irrelevant)),
            ((0, 1), Some(TransitionKind::Off)),
            ((0, 2), Some(TransitionKind::Off)),
            ((0, 3), Some(TransitionKind::Off)),
            ((0, 0), None),
            ((1, 1), None),
            ((3, 3), None),
            ((4, 0), None),
        ];

        for ((from, to), kind) in expected {
            assert_eq!(PairCode::new(from, to).classify(), kind, "pair {from}{to}");
        }
    }

    #[test]
    fn test_pair_code_display() {
        assert_eq!(PairCode::new(0, 1).to_string(), "01");
        assert_eq!(PairCode::new(3, 1).to_string(), "31");
    }

    #[test]
    fn test_transition_kind_serialization() {
        let json = serde_json::to_string(&TransitionKind::Irrelevant).unwrap();
        assert_eq!(json, "\"irrelevant\"");
        assert_eq!(TransitionKind::Use.as_str(), "use");
    }

    #[test]
    fn test_status_code_truncates() {
        let event = ScreenEvent {
            user: "u".to_string(),
            device: "d".to_string(),
            time: 0,
            datetime: DateTime::from_timestamp_millis(0).unwrap(),
            utc_offset_sec: 0,
            status: 3.0,
            source: EventSource::Screen,
        };
        assert_eq!(event.status_code(), 3);
    }

    #[test]
    fn test_local_datetime_follows_offset() {
        let event = ScreenEvent {
            user: "u".to_string(),
            device: "d".to_string(),
            time: 0,
            datetime: DateTime::from_timestamp_millis(0).unwrap(),
            utc_offset_sec: -5 * 3600,
            status: 1.0,
            source: EventSource::Screen,
        };
        assert_eq!(event.local_datetime().to_rfc3339(), "1969-12-31T19:00:00-05:00");
    }
}
