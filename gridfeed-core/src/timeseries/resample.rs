use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use gridfeed_types::{Metric, TimeSeriesPoint};

const SECS_PER_HOUR: i64 = 3600;

/// Average points onto hour buckets, per metric.
///
/// Points already on the hour with no siblings pass through unchanged, so
/// hourly input is returned as-is (after sorting). Output is sorted by metric,
/// then timestamp.
#[must_use]
pub fn resample_to_hourly(points: &[TimeSeriesPoint]) -> Vec<TimeSeriesPoint> {
    let mut buckets: BTreeMap<(Metric, i64), (f64, u32)> = BTreeMap::new();
    for p in points {
        let hour = p.timestamp.timestamp().div_euclid(SECS_PER_HOUR);
        let slot = buckets.entry((p.metric, hour)).or_insert((0.0, 0));
        slot.0 += p.value;
        slot.1 += 1;
    }
    buckets
        .into_iter()
        .filter_map(|((metric, hour), (sum, n))| {
            let ts: DateTime<Utc> = Utc.timestamp_opt(hour * SECS_PER_HOUR, 0).single()?;
            Some(TimeSeriesPoint::new(ts, metric, sum / f64::from(n)))
        })
        .collect()
}
