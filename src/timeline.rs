//! Timeline merging
//!
//! Fuses the screen log with shutdown pseudo-events from the battery log into
//! one sorted per-user timeline and removes duplicate sensor firings.

use crate::config::ScreenConfig;
use crate::error::ScreenError;
use crate::schema::RawRecord;
use crate::shutdown::extract_shutdowns;
use crate::types::{status, EventSource, ScreenEvent, ShutdownEvent};
use chrono::Utc;

/// Merge screen and battery tables into a deduplicated timeline.
///
/// Shutdown readings become synthetic "off" events so that a powered-down
/// phone does not look like missing screen data. The result is sorted by
/// (user, device, datetime); screen rows precede synthetic rows on ties.
pub fn merge_timeline(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<Vec<ScreenEvent>, ScreenError> {
    let column = config.screen_column_name.as_str();

    let mut events = screen
        .iter()
        .map(|record| screen_event(record, column))
        .collect::<Result<Vec<_>, _>>()?;

    if !battery.is_empty() {
        let shutdowns = extract_shutdowns(battery, &config.battery_column_name)?;
        log::debug!(
            "merging {} shutdown events from {} battery rows",
            shutdowns.len(),
            battery.len()
        );
        events.extend(shutdowns.into_iter().map(shutdown_event));
    }

    sort_timeline(&mut events);
    Ok(dedup_timeline(events))
}

/// Stable sort by (user, device, datetime)
pub fn sort_timeline(events: &mut [ScreenEvent]) {
    events.sort_by(|a, b| {
        (&a.user, &a.device, a.datetime).cmp(&(&b.user, &b.device, b.datetime))
    });
}

/// Drop repeated readings.
///
/// Within a (user, device) sequence, an event whose status equals the status
/// of the event right before it is a duplicate firing of the same state and
/// is removed; the first event of a run survives. Input must be sorted.
pub fn dedup_timeline(mut events: Vec<ScreenEvent>) -> Vec<ScreenEvent> {
    let before = events.len();
    events.dedup_by(|current, previous| {
        current.user == previous.user
            && current.device == previous.device
            && current.status == previous.status
    });

    let dropped = before - events.len();
    if dropped > 0 {
        log::debug!("dropped {} duplicate screen readings", dropped);
    }
    events
}

/// Split a sorted slice into maximal runs sharing the same key
pub(crate) fn runs_by_key<'a, T, K, F>(items: &'a [T], key: F) -> Vec<&'a [T]>
where
    K: PartialEq,
    F: Fn(&'a T) -> K,
{
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=items.len() {
        if i == items.len() || key(&items[i]) != key(&items[start]) {
            if i > start {
                runs.push(&items[start..i]);
            }
            start = i;
        }
    }
    runs
}

fn screen_event(record: &RawRecord, column: &str) -> Result<ScreenEvent, ScreenError> {
    let local = record.local_timestamp()?;
    Ok(ScreenEvent {
        user: record.user.clone(),
        device: record.device.clone(),
        time: record.time,
        datetime: local.with_timezone(&Utc),
        utc_offset_sec: local.offset().local_minus_utc(),
        status: record.numeric(column)?,
        source: EventSource::Screen,
    })
}

fn shutdown_event(shutdown: ShutdownEvent) -> ScreenEvent {
    ScreenEvent {
        user: shutdown.user,
        device: shutdown.device,
        time: shutdown.time,
        datetime: shutdown.datetime,
        utc_offset_sec: shutdown.utc_offset_sec,
        status: status::OFF as f64,
        source: EventSource::Shutdown,
    }
}
