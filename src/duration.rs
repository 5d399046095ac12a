//! Transition durations
//!
//! Each classified transition lasts until the event it was paired with. Long
//! "on" and "use" transitions usually mean the sensor stopped reporting, so
//! they are removed rather than imputed.

use crate::types::{ClassifiedEvent, TimedTransition, TransitionKind};
use chrono::Duration;

/// On/use transitions longer than this are treated as sensor artifacts
pub const ARTIFACT_THRESHOLD_HOURS: i64 = 10;

/// Attach durations (seconds) and drop artifacts.
///
/// Off and irrelevant transitions are never filtered by the threshold.
pub fn compute_durations(classified: &[ClassifiedEvent]) -> Vec<TimedTransition> {
    let threshold = Duration::hours(ARTIFACT_THRESHOLD_HOURS);
    let mut artifacts = 0usize;

    let timed: Vec<TimedTransition> = classified
        .iter()
        .filter_map(|row| {
            let elapsed = row.next_datetime - row.event.datetime;
            if is_artifact(row, elapsed, threshold) {
                artifacts += 1;
                return None;
            }
            Some(TimedTransition {
                transition: row.clone(),
                duration_sec: elapsed.num_milliseconds() as f64 / 1000.0,
            })
        })
        .collect();

    if artifacts > 0 {
        log::debug!(
            "discarded {} on/use transitions longer than {}h",
            artifacts,
            ARTIFACT_THRESHOLD_HOURS
        );
    }
    timed
}

fn is_artifact(row: &ClassifiedEvent, elapsed: Duration, threshold: Duration) -> bool {
    (row.is(TransitionKind::On) || row.is(TransitionKind::Use)) && elapsed > threshold
}
