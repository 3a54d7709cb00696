use crate::normalize::{Method, RequestEvent, RunCounters};
use chrono::{DateTime, Utc};
use itertools::Itertools;

/// A maximal contiguous run of failed POST requests.
///
/// A period of a single event has `start == end` and a duration of zero; it
/// still counts as downtime evidence with `failed_count = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FailurePeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: f64,
    pub failed_count: usize,
}

/// Reconstruct the failure periods from one run's POST outcomes.
///
/// Events without a parseable timestamp or without a resolved success value
/// are discarded. The remainder is sorted by timestamp (stable, ties keep
/// their original order) and partitioned into maximal runs of identical
/// success; every `false` run becomes one [`FailurePeriod`].
pub fn failure_periods(events: &[RequestEvent]) -> Vec<FailurePeriod> {
    let mut posts: Vec<(DateTime<Utc>, bool)> = events
        .iter()
        .filter(|event| event.method == Method::Post)
        .filter_map(|event| match (event.timestamp, event.success) {
            (Some(timestamp), Some(success)) => Some((timestamp, success)),
            _ => None,
        })
        .collect();
    posts.sort_by_key(|(timestamp, _)| *timestamp);

    let mut periods = Vec::new();
    for (success, group) in &posts.iter().chunk_by(|(_, success)| *success) {
        if success {
            continue;
        }
        let group: Vec<_> = group.copied().collect();
        let (Some(&(start, _)), Some(&(end, _))) = (group.first(), group.last()) else {
            continue;
        };
        periods.push(FailurePeriod {
            start,
            end,
            duration_seconds: (end - start).num_milliseconds() as f64 / 1000.0,
            failed_count: group.len(),
        });
    }
    periods
}

pub fn total_downtime_seconds(periods: &[FailurePeriod]) -> f64 {
    periods.iter().map(|period| period.duration_seconds).sum()
}

/// Approximate downtime when no per-event detail exists (flattened input):
/// the run duration scaled by the failed-POST ratio. The run duration is
/// taken from the earliest and latest POST timestamps on record.
///
/// Returns `None` when there are POSTs but no usable timestamps to derive a
/// run duration from. A run without any POSTs has nothing to lose, so its
/// estimate is zero.
pub fn estimate_downtime_seconds(events: &[RequestEvent], counters: &RunCounters) -> Option<f64> {
    let total_posts = counters.total_posts();
    if total_posts == 0 {
        return Some(0.0);
    }

    let (earliest, latest) = events
        .iter()
        .filter(|event| event.method == Method::Post)
        .filter_map(|event| event.timestamp)
        .minmax()
        .into_option()?;

    let run_duration = (latest - earliest).num_milliseconds() as f64 / 1000.0;
    Some(run_duration * counters.failed_posts as f64 / total_posts as f64)
}
