//! Transition classification
//!
//! Labels every event of a merged timeline with the transition it starts,
//! based on its own status and the status of the next event of the same user.
//! See [`PairCode::classify`] for the table.

use crate::timeline::{runs_by_key, sort_timeline};
use crate::types::{ClassifiedEvent, PairCode, ScreenEvent};

/// Classify consecutive intra-user event pairs.
///
/// Each user's events are put in time order across devices before pairing.
/// The last event of every user has no successor and yields no row. The first
/// and last classified rows of every user are then discarded as well, since we
/// do not know what happened before or after them. A user with two events
/// therefore contributes nothing.
pub fn classify_transitions(timeline: &[ScreenEvent]) -> Vec<ClassifiedEvent> {
    let mut ordered = timeline.to_vec();
    sort_timeline(&mut ordered);

    let mut classified = Vec::new();
    for user_events in runs_by_key(&ordered, |e| e.user.as_str()) {
        let mut user_events = user_events.to_vec();
        user_events.sort_by_key(|e| e.datetime);

        let pairs: Vec<ClassifiedEvent> = user_events
            .windows(2)
            .map(|pair| classify_pair(&pair[0], &pair[1]))
            .collect();
        classified.extend(trim_boundaries(pairs));
    }

    log::debug!(
        "classified {} of {} timeline events",
        classified.len(),
        timeline.len()
    );
    classified
}

/// Label `current` with the transition towards `next`
pub fn classify_pair(current: &ScreenEvent, next: &ScreenEvent) -> ClassifiedEvent {
    let pair = PairCode::new(current.status_code(), next.status_code());
    ClassifiedEvent {
        event: current.clone(),
        pair,
        kind: pair.classify(),
        next_datetime: next.datetime,
    }
}

fn trim_boundaries(mut rows: Vec<ClassifiedEvent>) -> Vec<ClassifiedEvent> {
    if rows.len() <= 2 {
        return Vec::new();
    }
    rows.pop();
    rows.remove(0);
    rows
}
