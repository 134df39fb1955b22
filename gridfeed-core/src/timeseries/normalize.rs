use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use gridfeed_types::{Metric, MetricSet, TimeSeriesPoint, TimeWindow};

/// Sort points by metric, then timestamp, keeping the last point seen for a
/// duplicated `(metric, timestamp)` pair.
///
/// Providers may return multi-segment or unordered series; the output satisfies
/// the strictly-increasing-timestamps invariant per metric.
#[must_use]
pub fn normalize(points: Vec<TimeSeriesPoint>) -> Vec<TimeSeriesPoint> {
    let mut by_key: BTreeMap<(Metric, DateTime<Utc>), TimeSeriesPoint> = BTreeMap::new();
    for p in points {
        if p.value.is_finite() {
            by_key.insert((p.metric, p.timestamp), p);
        }
    }
    by_key.into_values().collect()
}

/// Keep only points inside `window` whose metric is in `metrics`.
#[must_use]
pub fn restrict(
    points: Vec<TimeSeriesPoint>,
    window: &TimeWindow,
    metrics: MetricSet,
) -> Vec<TimeSeriesPoint> {
    points
        .into_iter()
        .filter(|p| metrics.has(p.metric) && window.contains(p.timestamp))
        .collect()
}

/// Whether each metric's timestamps are strictly increasing in slice order.
#[must_use]
pub fn is_strictly_increasing(points: &[TimeSeriesPoint]) -> bool {
    let mut last: BTreeMap<Metric, DateTime<Utc>> = BTreeMap::new();
    for p in points {
        if let Some(prev) = last.get(&p.metric)
            && *prev >= p.timestamp
        {
            return false;
        }
        last.insert(p.metric, p.timestamp);
    }
    true
}
