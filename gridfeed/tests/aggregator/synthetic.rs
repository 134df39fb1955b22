use gridfeed::{
    AggregateRequest, Capability, Gridfeed, GridfeedError, Metric, MetricSet, Provenance,
    Resolution, TimeWindow,
};

use crate::helpers::*;

fn offline() -> Gridfeed {
    Gridfeed::builder().force_synthetic(true).build().unwrap()
}

#[tokio::test]
async fn forced_synthesis_covers_every_metric() {
    let feed = offline();
    let bundle = feed
        .aggregate(&site_request("site-004", all_metrics()))
        .await
        .unwrap();

    assert_eq!(bundle.site.name, "Västerås Hydro Plant");
    assert_eq!(bundle.series.len(), 9);
    assert!(bundle.provenance.values().all(|p| *p == Provenance::Synthetic));
    assert_eq!(bundle.synthetic_metrics().count(), 9);

    for cap in [Capability::Market, Capability::Carbon, Capability::Weather] {
        let outcome = &bundle.outcomes[&cap];
        assert_eq!(outcome.resolution, Resolution::Synthetic);
        assert_eq!(outcome.provider, None);
        assert_eq!(outcome.error, None);
    }

    let mix = bundle.grid_mix.expect("carbon requested");
    assert_eq!(mix.provenance, Provenance::Synthetic);
    assert!(mix.breakdown.total() > 0.0);

    let window = morning();
    let stamps: Vec<_> = bundle.series[&Metric::Price]
        .iter()
        .map(|p| p.timestamp)
        .collect();
    assert_eq!(stamps, window.hours().collect::<Vec<_>>());
}

#[tokio::test]
async fn synthesis_is_deterministic_per_query() {
    let feed = offline();
    let req = site_request("site-002", all_metrics());
    let a = feed.aggregate(&req).await.unwrap();
    let b = feed.aggregate(&req).await.unwrap();
    assert_eq!(a.series, b.series);
    assert_eq!(a.grid_mix, b.grid_mix);

    let other = offline().aggregate(&req).await.unwrap();
    assert_eq!(a.series, other.series, "stable across instances");
}

#[tokio::test]
async fn partial_hours_are_widened() {
    let feed = offline();
    let window = TimeWindow::new(
        dt(2024, 6, 1, 6) + chrono::TimeDelta::minutes(20),
        dt(2024, 6, 1, 8) + chrono::TimeDelta::minutes(5),
    )
    .unwrap();
    let bundle = feed
        .aggregate(&AggregateRequest::site("site-001", window, MetricSet::TEMPERATURE))
        .await
        .unwrap();
    let series = &bundle.series[&Metric::Temperature];
    assert_eq!(series.len(), 3);
    assert_eq!(series[0].timestamp, dt(2024, 6, 1, 6));
    assert_eq!(series[2].timestamp, dt(2024, 6, 1, 8));
}

#[tokio::test]
async fn only_requested_capabilities_are_resolved() {
    let bundle = offline()
        .aggregate(&stockholm_request(MetricSet::HUMIDITY))
        .await
        .unwrap();
    assert_eq!(bundle.series.keys().copied().collect::<Vec<_>>(), vec![Metric::Humidity]);
    assert_eq!(
        bundle.outcomes.keys().copied().collect::<Vec<_>>(),
        vec![Capability::Weather]
    );
    assert!(bundle.grid_mix.is_none());
}

#[test]
fn builder_requires_a_connector_unless_forced() {
    assert!(matches!(
        Gridfeed::builder().build(),
        Err(GridfeedError::NoConnectors)
    ));
}

#[tokio::test]
async fn unknown_site_is_an_error() {
    let err = offline()
        .aggregate(&site_request("site-999", all_metrics()))
        .await
        .unwrap_err();
    assert!(matches!(err, GridfeedError::UnknownSite { ref id } if id == "site-999"));
}

#[tokio::test]
async fn empty_metric_set_is_rejected() {
    let err = offline()
        .aggregate(&stockholm_request(MetricSet::empty()))
        .await
        .unwrap_err();
    assert!(matches!(err, GridfeedError::InvalidArg(_)));
}
