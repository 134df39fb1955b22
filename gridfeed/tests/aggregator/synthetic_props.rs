use proptest::prelude::*;

use gridfeed::{AggregateRequest, Coordinate, Gridfeed, MetricSet, TimeWindow};

use crate::helpers::*;

proptest! {
    #![proptest_config(ProptestConfig { cases: 24, .. ProptestConfig::default() })]
    #[test]
    fn synthetic_series_are_hourly_and_repeatable(
        offset_h in 0i64..(24 * 365),
        hours in 1i64..=72,
        bits in 1u16..(1 << 9),
        lat in 55.0f64..69.0,
        lon in 11.0f64..24.0,
    ) {
        let metrics = MetricSet::from_bits_truncate(bits);
        prop_assume!(!metrics.is_empty());
        let start = dt(2024, 1, 1, 0) + chrono::TimeDelta::hours(offset_h);
        let window = TimeWindow::new(start, start + chrono::TimeDelta::hours(hours)).unwrap();
        let coordinate = Coordinate::new(lat, lon).unwrap();

        let (a, b) = tokio_test::block_on(async move {
            let feed = Gridfeed::builder().force_synthetic(true).build().unwrap();
            let req = AggregateRequest::coordinate(coordinate, window, metrics);
            let a = feed.aggregate(&req).await.unwrap();
            let b = feed.aggregate(&req).await.unwrap();
            (a, b)
        });

        prop_assert_eq!(a.series.len(), metrics.metrics().count());
        for points in a.series.values() {
            prop_assert_eq!(points.len() as i64, hours);
            prop_assert!(points.iter().all(|p| p.value.is_finite()));
            prop_assert!(points
                .windows(2)
                .all(|w| w[1].timestamp - w[0].timestamp == chrono::TimeDelta::hours(1)));
        }
        prop_assert_eq!(a.series, b.series);
    }
}
