//! Window aggregation primitive
//!
//! Groups per-user observations into fixed windows and reduces each window to
//! one value. Window edges are laid out in the producer's local time, so a
//! daily window runs from local midnight to local midnight. For every user,
//! all windows between the first and the last populated one are visited; an
//! empty window takes whatever the reducer yields for no input (0 for sums,
//! nothing otherwise).

use crate::config::{ResampleRule, WindowOrigin};
use crate::table::WindowKey;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;

const DAY_MILLIS: i64 = 86_400_000;

/// Reduction applied to the values of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Min,
    Max,
    Mean,
    Median,
    /// Sample standard deviation (n - 1 denominator)
    Std,
}

impl Reducer {
    pub fn reduce(&self, values: &[f64]) -> Option<f64> {
        match self {
            Reducer::Sum => Some(values.iter().sum()),
            Reducer::Min => values.iter().copied().reduce(f64::min),
            Reducer::Max => values.iter().copied().reduce(f64::max),
            Reducer::Mean => mean(values),
            Reducer::Median => median(values),
            Reducer::Std => sample_std(values),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn offset_millis(datetime: &DateTime<FixedOffset>) -> i64 {
    i64::from(datetime.offset().local_minus_utc()) * 1000
}

/// Milliseconds since the epoch on the local wall clock
fn local_millis(datetime: &DateTime<FixedOffset>) -> i64 {
    datetime.timestamp_millis() + offset_millis(datetime)
}

/// Window edges of one user's series, in local milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGrid {
    step: i64,
    anchor: i64,
}

impl WindowGrid {
    /// Grid for a series whose earliest observation is `first`
    pub fn new(rule: &ResampleRule, first: DateTime<FixedOffset>) -> Self {
        let first_local = local_millis(&first);
        let origin = match rule.origin() {
            WindowOrigin::Epoch => 0,
            WindowOrigin::StartDay => first_local.div_euclid(DAY_MILLIS) * DAY_MILLIS,
            WindowOrigin::Start => first_local,
        };
        Self {
            step: rule.step_millis(),
            anchor: origin + rule.offset().num_milliseconds(),
        }
    }

    /// Local start of the window containing `local_ms`
    fn bucket(&self, local_ms: i64) -> i64 {
        self.anchor + (local_ms - self.anchor).div_euclid(self.step) * self.step
    }

    /// Start instant of the window containing `datetime`
    pub fn window_start(&self, datetime: DateTime<FixedOffset>) -> Option<DateTime<Utc>> {
        let start = self.bucket(local_millis(&datetime)) - offset_millis(&datetime);
        DateTime::from_timestamp_millis(start)
    }
}

/// Resample `(user, datetime, value)` points with a numeric reducer
pub fn resample_by_user<D, I>(
    points: I,
    rule: &ResampleRule,
    reducer: Reducer,
) -> Vec<(WindowKey, f64)>
where
    D: Into<DateTime<FixedOffset>>,
    I: IntoIterator<Item = (String, D, f64)>,
{
    resample_with(points, rule, |values| reducer.reduce(values))
}

/// Resample `(user, datetime, value)` points with an arbitrary reduction.
///
/// Window starts are reported as instants. Output is ordered by user, then
/// window start.
pub fn resample_with<D, T, R, I, F>(
    points: I,
    rule: &ResampleRule,
    reduce: F,
) -> Vec<(WindowKey, R)>
where
    D: Into<DateTime<FixedOffset>>,
    I: IntoIterator<Item = (String, D, T)>,
    F: Fn(&[T]) -> Option<R>,
{
    let mut by_user: BTreeMap<String, Vec<(DateTime<FixedOffset>, T)>> = BTreeMap::new();
    for (user, datetime, value) in points {
        by_user.entry(user).or_default().push((datetime.into(), value));
    }

    let mut out = Vec::new();
    for (user, mut series) in by_user {
        series.sort_by_key(|(datetime, _)| *datetime);
        let Some(&(first, _)) = series.first() else {
            continue;
        };
        let grid = WindowGrid::new(rule, first);

        // local window start -> (UTC offset of its first point, values)
        let mut buckets: BTreeMap<i64, (i64, Vec<T>)> = BTreeMap::new();
        for (datetime, value) in series {
            buckets
                .entry(grid.bucket(local_millis(&datetime)))
                .or_insert_with(|| (offset_millis(&datetime), Vec::new()))
                .1
                .push(value);
        }

        let (Some(&first_start), Some(&last_start)) =
            (buckets.keys().next(), buckets.keys().next_back())
        else {
            continue;
        };

        let mut offset = 0;
        let mut start = first_start;
        while start <= last_start {
            let values: &[T] = match buckets.get(&start) {
                Some((bucket_offset, values)) => {
                    offset = *bucket_offset;
                    values.as_slice()
                }
                None => &[],
            };
            if let (Some(value), Some(window_start)) =
                (reduce(values), DateTime::from_timestamp_millis(start - offset))
            {
                out.push((WindowKey::new(&user, window_start), value));
            }
            start += grid.step;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap()
    }

    fn thirty_minutes() -> ResampleRule {
        ResampleRule::parse("30T").unwrap()
    }

    #[test]
    fn test_reducers() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(Reducer::Sum.reduce(&values), Some(10.0));
        assert_eq!(Reducer::Min.reduce(&values), Some(1.0));
        assert_eq!(Reducer::Max.reduce(&values), Some(4.0));
        assert_eq!(Reducer::Mean.reduce(&values), Some(2.5));
        assert_eq!(Reducer::Median.reduce(&values), Some(2.5));
        assert_eq!(Reducer::Median.reduce(&[5.0, 1.0, 3.0]), Some(3.0));

        let std = Reducer::Std.reduce(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((std - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_reducers_on_empty_and_single() {
        assert_eq!(Reducer::Sum.reduce(&[]), Some(0.0));
        assert_eq!(Reducer::Min.reduce(&[]), None);
        assert_eq!(Reducer::Mean.reduce(&[]), None);
        assert_eq!(Reducer::Median.reduce(&[]), None);
        assert_eq!(Reducer::Std.reduce(&[3.0]), None);
    }

    fn plus_three(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, day, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_window_start_alignment() {
        let grid = WindowGrid::new(&thirty_minutes(), at(8, 44).into());
        assert_eq!(grid.window_start(at(8, 44).into()), Some(at(8, 30)));
        assert_eq!(grid.window_start(at(8, 30).into()), Some(at(8, 30)));

        let daily = WindowGrid::new(&ResampleRule::daily(), at(23, 59).into());
        assert_eq!(daily.window_start(at(23, 59).into()), Some(at(0, 0)));
    }

    #[test]
    fn test_offset_shifts_window_edges() {
        let rule = ResampleRule::parse("1H")
            .unwrap()
            .with_offset(Duration::minutes(15));
        let grid = WindowGrid::new(&rule, at(8, 10).into());
        assert_eq!(grid.window_start(at(8, 44).into()), Some(at(8, 15)));
        assert_eq!(grid.window_start(at(8, 10).into()), Some(at(7, 15)));
    }

    #[test]
    fn test_start_origin_anchors_on_first_point() {
        let rule = ResampleRule::parse("1H")
            .unwrap()
            .with_origin(WindowOrigin::Start);
        let points = vec![
            ("u1".to_string(), at(8, 20), 1.0),
            ("u1".to_string(), at(9, 10), 1.0),
            ("u1".to_string(), at(9, 30), 1.0),
        ];

        let out = resample_by_user(points, &rule, Reducer::Sum);
        let values: Vec<(DateTime<Utc>, f64)> =
            out.iter().map(|(k, v)| (k.window_start, *v)).collect();
        assert_eq!(values, vec![(at(8, 20), 2.0), (at(9, 20), 1.0)]);
    }

    #[test]
    fn test_daily_windows_follow_local_midnight() {
        let points = vec![
            ("u1".to_string(), plus_three(15, 23, 50), 1.0),
            ("u1".to_string(), plus_three(16, 0, 30), 1.0),
            ("u1".to_string(), plus_three(16, 23, 30), 1.0),
        ];

        let out = resample_by_user(points, &ResampleRule::daily(), Reducer::Sum);
        let values: Vec<(DateTime<Utc>, f64)> =
            out.iter().map(|(k, v)| (k.window_start, *v)).collect();
        assert_eq!(
            values,
            vec![
                (Utc.with_ymd_and_hms(2024, 1, 14, 21, 0, 0).unwrap(), 1.0),
                (Utc.with_ymd_and_hms(2024, 1, 15, 21, 0, 0).unwrap(), 2.0),
            ]
        );
    }

    #[test]
    fn test_weekly_windows_span_seven_days() {
        let points = vec![
            ("u1".to_string(), at(8, 0), 1.0),
            ("u1".to_string(), at(8, 0) + Duration::days(6), 1.0),
            ("u1".to_string(), at(8, 0) + Duration::days(8), 1.0),
        ];

        let out = resample_by_user(points, &ResampleRule::parse("1W").unwrap(), Reducer::Sum);
        let values: Vec<(DateTime<Utc>, f64)> =
            out.iter().map(|(k, v)| (k.window_start, *v)).collect();
        assert_eq!(
            values,
            vec![(at(0, 0), 2.0), (at(0, 0) + Duration::days(7), 1.0)]
        );
    }

    #[test]
    fn test_sum_fills_interior_windows() {
        let points = vec![
            ("u1".to_string(), at(8, 5), 1.0),
            ("u1".to_string(), at(8, 10), 1.0),
            ("u1".to_string(), at(9, 40), 1.0),
        ];

        let out = resample_by_user(points, &thirty_minutes(), Reducer::Sum);
        let values: Vec<(DateTime<Utc>, f64)> =
            out.iter().map(|(k, v)| (k.window_start, *v)).collect();
        assert_eq!(
            values,
            vec![
                (at(8, 0), 2.0),
                (at(8, 30), 0.0),
                (at(9, 0), 0.0),
                (at(9, 30), 1.0)
            ]
        );
    }

    #[test]
    fn test_mean_leaves_interior_windows_absent() {
        let points = vec![
            ("u1".to_string(), at(8, 5), 10.0),
            ("u1".to_string(), at(9, 40), 20.0),
        ];

        let out = resample_by_user(points, &thirty_minutes(), Reducer::Mean);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].0.window_start, at(9, 30));
    }

    #[test]
    fn test_users_are_independent() {
        let points = vec![
            ("u2".to_string(), at(8, 0), 1.0),
            ("u1".to_string(), at(10, 0), 1.0),
        ];

        let out = resample_by_user(points, &thirty_minutes(), Reducer::Sum);
        let keys: Vec<(&str, DateTime<Utc>)> = out
            .iter()
            .map(|(k, _)| (k.user.as_str(), k.window_start))
            .collect();
        assert_eq!(keys, vec![("u1", at(10, 0)), ("u2", at(8, 0))]);
    }

    #[test]
    fn test_resample_with_custom_reduction() {
        let points = vec![
            ("u1".to_string(), at(8, 5), at(8, 5)),
            ("u1".to_string(), at(8, 1), at(8, 1)),
            ("u1".to_string(), at(8, 0) + Duration::days(1), at(8, 0) + Duration::days(1)),
        ];

        let out = resample_with(points, &ResampleRule::daily(), |v: &[DateTime<Utc>]| {
            v.iter().min().copied()
        });
        let firsts: Vec<DateTime<Utc>> = out.iter().map(|(_, v)| *v).collect();
        assert_eq!(firsts, vec![at(8, 1), at(8, 0) + Duration::days(1)]);
    }
}
