//! Screen features
//!
//! Each feature runs the merge → classify → duration chain on the raw tables
//! and aggregates the result per user and window:
//! - screen-off events
//! - on/off/use transition counts
//! - total/min/max/mean/median/std of on/off/use durations
//! - first unlock of each day

use crate::classifier::classify_transitions;
use crate::config::{ResampleRule, ScreenConfig};
use crate::duration::compute_durations;
use crate::error::ScreenError;
use crate::schema::RawRecord;
use crate::table::{FeatureTable, FeatureValue, WindowKey};
use crate::timeline::merge_timeline;
use crate::types::{status, ClassifiedEvent, ScreenEvent, TimedTransition, TransitionKind};
use crate::window::{resample_by_user, resample_with, Reducer};
use chrono::{DateTime, Utc};

/// Transition kinds that get their own count/duration columns, in column order
const REPORTED_KINDS: [TransitionKind; 3] =
    [TransitionKind::On, TransitionKind::Off, TransitionKind::Use];

/// Intermediate stages shared by all features
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTimeline {
    /// Merged, deduplicated timeline
    pub merged: Vec<ScreenEvent>,
    /// Classified transitions after boundary trimming
    pub classified: Vec<ClassifiedEvent>,
    /// Classified transitions with durations, artifacts removed
    pub timed: Vec<TimedTransition>,
}

impl PreparedTimeline {
    /// Run the full chain on raw screen and battery tables
    pub fn build(
        screen: &[RawRecord],
        battery: &[RawRecord],
        config: &ScreenConfig,
    ) -> Result<Self, ScreenError> {
        let merged = merge_timeline(screen, battery, config)?;
        let classified = classify_transitions(&merged);
        let timed = compute_durations(&classified);
        Ok(Self {
            merged,
            classified,
            timed,
        })
    }
}

/// Statically declared feature registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenFeature {
    Off,
    Count,
    Duration,
    DurationMin,
    DurationMax,
    DurationMean,
    DurationMedian,
    DurationStd,
    FirstUnlock,
}

impl ScreenFeature {
    /// Every feature, in default computation order
    pub const ALL: [ScreenFeature; 9] = [
        ScreenFeature::Off,
        ScreenFeature::Count,
        ScreenFeature::Duration,
        ScreenFeature::DurationMin,
        ScreenFeature::DurationMax,
        ScreenFeature::DurationMean,
        ScreenFeature::DurationMedian,
        ScreenFeature::DurationStd,
        ScreenFeature::FirstUnlock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScreenFeature::Off => "screen_off",
            ScreenFeature::Count => "screen_count",
            ScreenFeature::Duration => "screen_duration",
            ScreenFeature::DurationMin => "screen_duration_min",
            ScreenFeature::DurationMax => "screen_duration_max",
            ScreenFeature::DurationMean => "screen_duration_mean",
            ScreenFeature::DurationMedian => "screen_duration_median",
            ScreenFeature::DurationStd => "screen_duration_std",
            ScreenFeature::FirstUnlock => "screen_first_unlock",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ScreenError> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| ScreenError::UnknownFeature(name.to_string()))
    }

    /// Compute the feature from raw tables
    pub fn compute(
        &self,
        screen: &[RawRecord],
        battery: &[RawRecord],
        config: &ScreenConfig,
    ) -> Result<FeatureTable, ScreenError> {
        let prepared = PreparedTimeline::build(screen, battery, config)?;
        self.compute_prepared(&prepared, config)
    }

    /// Compute the feature from an already prepared timeline
    pub fn compute_prepared(
        &self,
        prepared: &PreparedTimeline,
        config: &ScreenConfig,
    ) -> Result<FeatureTable, ScreenError> {
        let rule = config.resample_args.rule()?;
        let table = match self {
            ScreenFeature::Off => off_events(&prepared.merged),
            ScreenFeature::Count => transition_counts(&prepared.classified, &rule),
            ScreenFeature::Duration => duration_stat(&prepared.timed, &rule, DurationStat::Total),
            ScreenFeature::DurationMin => duration_stat(&prepared.timed, &rule, DurationStat::Min),
            ScreenFeature::DurationMax => duration_stat(&prepared.timed, &rule, DurationStat::Max),
            ScreenFeature::DurationMean => {
                duration_stat(&prepared.timed, &rule, DurationStat::Mean)
            }
            ScreenFeature::DurationMedian => {
                duration_stat(&prepared.timed, &rule, DurationStat::Median)
            }
            ScreenFeature::DurationStd => duration_stat(&prepared.timed, &rule, DurationStat::Std),
            ScreenFeature::FirstUnlock => first_unlock(&prepared.classified),
        };
        Ok(table)
    }
}

/// Duration statistic and its column suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationStat {
    Total,
    Min,
    Max,
    Mean,
    Median,
    Std,
}

impl DurationStat {
    fn reducer(&self) -> Reducer {
        match self {
            DurationStat::Total => Reducer::Sum,
            DurationStat::Min => Reducer::Min,
            DurationStat::Max => Reducer::Max,
            DurationStat::Mean => Reducer::Mean,
            DurationStat::Median => Reducer::Median,
            DurationStat::Std => Reducer::Std,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            DurationStat::Total => "durationtotal",
            DurationStat::Min => "durationminimum",
            DurationStat::Max => "durationmaximum",
            DurationStat::Mean => "durationmean",
            DurationStat::Median => "durationmedian",
            DurationStat::Std => "durationstd",
        }
    }
}

/// Timestamps at which the screen turned off, marked with 1
pub fn screen_off(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::Off.compute(screen, battery, config)
}

/// Number of on, off and use transitions per window
pub fn screen_count(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::Count.compute(screen, battery, config)
}

/// Total seconds spent in on, off and use transitions per window
pub fn screen_duration(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::Duration.compute(screen, battery, config)
}

/// Shortest on, off and use transition per window (seconds)
pub fn screen_duration_min(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::DurationMin.compute(screen, battery, config)
}

/// Longest on, off and use transition per window (seconds)
pub fn screen_duration_max(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::DurationMax.compute(screen, battery, config)
}

/// Mean on, off and use transition duration per window (seconds)
pub fn screen_duration_mean(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::DurationMean.compute(screen, battery, config)
}

/// Median on, off and use transition duration per window (seconds)
pub fn screen_duration_median(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::DurationMedian.compute(screen, battery, config)
}

/// Sample standard deviation of on, off and use durations per window (seconds)
pub fn screen_duration_std(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::DurationStd.compute(screen, battery, config)
}

/// First time the screen was turned on each local day
pub fn screen_first_unlock(
    screen: &[RawRecord],
    battery: &[RawRecord],
    config: &ScreenConfig,
) -> Result<FeatureTable, ScreenError> {
    ScreenFeature::FirstUnlock.compute(screen, battery, config)
}

fn off_events(merged: &[ScreenEvent]) -> FeatureTable {
    let mut table = FeatureTable::new();
    table.add_column("screen_off");
    for event in merged.iter().filter(|e| e.status_code() == status::OFF) {
        table.insert(
            WindowKey::new(&event.user, event.datetime),
            "screen_off",
            FeatureValue::Number(1.0),
        );
    }
    table
}

fn transition_counts(classified: &[ClassifiedEvent], rule: &ResampleRule) -> FeatureTable {
    let mut table = FeatureTable::new();
    for kind in REPORTED_KINDS {
        let points = classified.iter().map(|row| {
            let flag = if row.is(kind) { 1.0 } else { 0.0 };
            (row.event.user.clone(), row.event.local_datetime(), flag)
        });
        let column = format!("screen_{}_count", kind.as_str());
        table.insert_column(&column, resample_by_user(points, rule, Reducer::Sum));
    }
    table
}

fn duration_stat(timed: &[TimedTransition], rule: &ResampleRule, stat: DurationStat) -> FeatureTable {
    let mut table = FeatureTable::new();
    for kind in REPORTED_KINDS {
        let points = timed
            .iter()
            .filter(|row| row.transition.is(kind))
            .map(|row| {
                (
                    row.transition.event.user.clone(),
                    row.transition.event.local_datetime(),
                    row.duration_sec,
                )
            });
        let column = format!("screen_{}_{}", kind.as_str(), stat.suffix());
        table.insert_column(&column, resample_by_user(points, rule, stat.reducer()));
    }
    table
}

fn first_unlock(classified: &[ClassifiedEvent]) -> FeatureTable {
    let points = classified
        .iter()
        .filter(|row| row.is(TransitionKind::On))
        .map(|row| {
            (
                row.event.user.clone(),
                row.event.local_datetime(),
                row.event.datetime,
            )
        });
    let firsts = resample_with(points, &ResampleRule::daily(), |values: &[DateTime<Utc>]| {
        values.iter().min().copied()
    });

    let mut table = FeatureTable::new();
    table.add_column("screen_first_unlock");
    for (key, first) in firsts {
        table.insert(key, "screen_first_unlock", FeatureValue::Timestamp(first));
    }
    table
}
