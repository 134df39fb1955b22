use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridfeed::{
    AggregateRequest, CacheConfig, Capability, Coordinate, FetchError, FetchQuery, Gridfeed,
    GridConnector, Metric, MetricSet, ProviderResult, Resolution, TimeSeriesPoint,
};
use gridfeed_core::connector::MarketProvider;
use gridfeed_mock::{MockBehavior, MockConnector};

use crate::helpers::*;

fn everything() -> Arc<MockConnector> {
    mock(
        "m-all",
        &[Capability::Market, Capability::Carbon, Capability::Weather],
        MockBehavior::Return,
    )
}

#[tokio::test(start_paused = true)]
async fn repeated_request_is_served_from_cache() {
    let conn = everything();
    let feed = feed_with(&[conn.clone()]);
    let req = site_request("site-003", all_metrics());

    let first = feed.aggregate(&req).await.unwrap();
    let second = feed.aggregate(&req).await.unwrap();

    for cap in [Capability::Market, Capability::Carbon, Capability::Weather] {
        assert_eq!(conn.calls(cap), 1, "{cap} fetched once");
        assert_eq!(first.outcomes[&cap].resolution, Resolution::Live);
        assert_eq!(second.outcomes[&cap].resolution, Resolution::Cached);
    }
    assert_eq!(first.series, second.series);
    assert_eq!(first.provenance, second.provenance);
    assert_eq!(first.grid_mix, second.grid_mix);
}

#[tokio::test(start_paused = true)]
async fn expired_entries_are_refetched() {
    let conn = everything();
    let feed = feed_with(&[conn.clone()]);
    let req = site_request("site-003", all_metrics());

    feed.aggregate(&req).await.unwrap();
    tokio::time::advance(Duration::from_secs(61 * 60)).await;
    let again = feed.aggregate(&req).await.unwrap();

    for cap in [Capability::Market, Capability::Carbon, Capability::Weather] {
        assert_eq!(conn.calls(cap), 2, "{cap} refetched after expiry");
        assert_eq!(again.outcomes[&cap].resolution, Resolution::Live);
    }
}

#[tokio::test(start_paused = true)]
async fn weather_expires_before_market() {
    let conn = everything();
    let feed = feed_with(&[conn.clone()]);
    let req = stockholm_request(MetricSet::PRICE | MetricSet::TEMPERATURE);

    feed.aggregate(&req).await.unwrap();
    tokio::time::advance(Duration::from_secs(31 * 60)).await;
    let again = feed.aggregate(&req).await.unwrap();

    assert_eq!(conn.calls(Capability::Market), 1);
    assert_eq!(conn.calls(Capability::Weather), 2);
    assert_eq!(again.outcomes[&Capability::Market].resolution, Resolution::Cached);
    assert_eq!(again.outcomes[&Capability::Weather].resolution, Resolution::Live);
}

#[tokio::test]
async fn nearby_coordinates_share_cache_entries() {
    let conn = everything();
    let feed = feed_with(&[conn.clone()]);
    let a = Coordinate::new(59.3293, 18.0686).unwrap();
    let b = Coordinate::new(59.3311, 18.0712).unwrap();

    feed.aggregate(&AggregateRequest::coordinate(a, morning(), MetricSet::PRICE))
        .await
        .unwrap();
    let second = feed
        .aggregate(&AggregateRequest::coordinate(b, morning(), MetricSet::PRICE))
        .await
        .unwrap();

    assert_eq!(conn.calls(Capability::Market), 1);
    assert_eq!(second.outcomes[&Capability::Market].resolution, Resolution::Cached);
}

#[tokio::test]
async fn different_metric_sets_do_not_collide() {
    let conn = everything();
    let feed = feed_with(&[conn.clone()]);

    feed.aggregate(&stockholm_request(MetricSet::PRICE)).await.unwrap();
    feed.aggregate(&stockholm_request(MetricSet::PRICE | MetricSet::LOAD_MW))
        .await
        .unwrap();

    assert_eq!(conn.calls(Capability::Market), 2);
}

#[tokio::test]
async fn zero_ttl_disables_caching_for_that_capability() {
    let conn = everything();
    let feed = Gridfeed::builder()
        .with_connector(conn.clone() as Arc<dyn GridConnector>)
        .cache_config(CacheConfig::default().with_ttl(Capability::Market, Duration::ZERO))
        .build()
        .unwrap();
    let req = stockholm_request(MetricSet::PRICE | MetricSet::TEMPERATURE);

    feed.aggregate(&req).await.unwrap();
    let again = feed.aggregate(&req).await.unwrap();

    assert_eq!(conn.calls(Capability::Market), 2);
    assert_eq!(conn.calls(Capability::Weather), 1);
    assert_eq!(again.outcomes[&Capability::Market].resolution, Resolution::Live);
}

/// Prices that depend on whether the query names a generation technology.
struct TechnologyPriced;

impl GridConnector for TechnologyPriced {
    fn name(&self) -> &'static str {
        "tech-priced"
    }

    fn as_market_provider(&self) -> Option<&dyn MarketProvider> {
        Some(self as &dyn MarketProvider)
    }
}

#[async_trait]
impl MarketProvider for TechnologyPriced {
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let price = if query.technology.is_some() { 1.0 } else { 100.0 };
        let points = query
            .window
            .hours()
            .map(|ts| TimeSeriesPoint::new(ts, Metric::Price, price))
            .collect();
        Ok(ProviderResult::real(
            self.name(),
            query.signature(self.name()),
            points,
        ))
    }
}

#[tokio::test]
async fn site_and_bare_coordinate_do_not_share_entries() {
    let feed = Gridfeed::builder()
        .with_connector(Arc::new(TechnologyPriced))
        .build()
        .unwrap();

    // site-001 sits on the Stockholm coordinate
    let site = feed
        .aggregate(&site_request("site-001", MetricSet::PRICE))
        .await
        .unwrap();
    assert_eq!(site.site.coordinate, Coordinate::STOCKHOLM);
    assert_eq!(site.series[&Metric::Price][0].value, 1.0);

    let bare = feed
        .aggregate(&stockholm_request(MetricSet::PRICE))
        .await
        .unwrap();
    assert_eq!(bare.outcomes[&Capability::Market].resolution, Resolution::Live);
    assert!(bare.series[&Metric::Price].iter().all(|p| p.value == 100.0));
}
