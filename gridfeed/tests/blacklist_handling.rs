use std::sync::Arc;
use std::time::Duration;

use gridfeed::{
    CacheConfig, Capability, ConnectorBuilder, FetchError, Gridfeed, GridConnector, Metric,
    MetricSet, Provenance, QuotaConfig, QuotaWindow, Resolution, SiteSource,
};
use gridfeed_mock::{MockBehavior, MockConnector};

mod helpers;
use helpers::*;

#[tokio::test]
async fn exhausted_quota_falls_back_to_static_sites() {
    let inner = mock("m-sites", &[Capability::Sites], MockBehavior::Return);
    let wrapped = ConnectorBuilder::new(inner.clone() as Arc<dyn GridConnector>)
        .with_quota(&QuotaConfig {
            limit: 1,
            warn_remaining: 0,
            window: QuotaWindow::Rolling(Duration::from_secs(3600)),
        })
        .build();
    let feed = Gridfeed::builder()
        .with_connector(wrapped)
        .cache_config(CacheConfig::default().with_ttl(Capability::Sites, Duration::ZERO))
        .build()
        .expect("gridfeed builds");

    let (_, first) = feed.sites_with_source().await;
    assert_eq!(first, SiteSource::Live);

    // budget spent: the quota layer refuses before the inner feed is reached
    let (sites, second) = feed.sites_with_source().await;
    assert_eq!(second, SiteSource::Static);
    assert_eq!(sites.len(), 4);
    assert_eq!(inner.calls(Capability::Sites), 1);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_carbon_feed_is_benched() {
    let inner = failing(
        "m-carbon",
        Capability::Carbon,
        FetchError::rate_limit("m-carbon", None),
    );
    let benched = ConnectorBuilder::new(inner.clone() as Arc<dyn GridConnector>)
        .with_blacklist(Duration::from_secs(5 * 60))
        .build();
    let feed = Gridfeed::builder()
        .with_connector(benched)
        .build()
        .expect("gridfeed builds");
    let req = stockholm_request(MetricSet::CARBON_INTENSITY);

    let first = feed.aggregate(&req).await.unwrap();
    assert_eq!(first.provenance[&Metric::CarbonIntensity], Provenance::Synthetic);
    assert_eq!(inner.calls(Capability::Carbon), 1);

    let second = feed.aggregate(&req).await.unwrap();
    assert_eq!(second.outcomes[&Capability::Carbon].resolution, Resolution::Synthetic);
    assert!(
        second.outcomes[&Capability::Carbon]
            .error
            .as_deref()
            .unwrap()
            .contains("rate limited")
    );
    assert_eq!(inner.calls(Capability::Carbon), 1, "benched, not called");

    // the bench lifts after the cool-down
    tokio::time::advance(Duration::from_secs(5 * 60 + 1)).await;
    inner.set_behavior(Capability::Carbon, MockBehavior::Return);
    let third = feed.aggregate(&req).await.unwrap();
    assert_eq!(third.provenance[&Metric::CarbonIntensity], Provenance::Real);
    assert_eq!(inner.calls(Capability::Carbon), 2);
}

#[tokio::test]
async fn benched_connector_yields_to_the_next_one() {
    let primary = failing("primary", Capability::Market, FetchError::auth("primary", 403));
    let backup = Arc::new(MockConnector::named("backup", &[Capability::Market]));
    let feed = Gridfeed::builder()
        .with_connector(
            ConnectorBuilder::new(primary.clone() as Arc<dyn GridConnector>)
                .with_blacklist(Duration::from_secs(60))
                .build(),
        )
        .with_connector(backup.clone() as Arc<dyn GridConnector>)
        .cache_config(CacheConfig::default().with_ttl(Capability::Market, Duration::ZERO))
        .build()
        .expect("gridfeed builds");
    let req = stockholm_request(MetricSet::PRICE);

    for _ in 0..3 {
        let bundle = feed.aggregate(&req).await.unwrap();
        assert_eq!(
            bundle.outcomes[&Capability::Market].provider.as_deref(),
            Some("backup")
        );
    }
    assert_eq!(primary.calls(Capability::Market), 1);
    assert_eq!(backup.calls(Capability::Market), 3);
}
