use std::sync::Arc;
use std::time::Duration;

use gridfeed::{
    Capability, FetchError, Gridfeed, GridConnector, GridfeedError, MetricSet, SiteSource,
    SiteStatus, Technology, builtin_sites,
};
use gridfeed_mock::MockBehavior;

use crate::helpers::*;

#[tokio::test]
async fn without_a_feed_the_builtin_list_is_used() {
    let market = mock("m-market", &[Capability::Market], MockBehavior::Return);
    let feed = feed_with(&[market]);

    let (sites, source) = feed.sites_with_source().await;
    assert_eq!(source, SiteSource::Static);
    assert_eq!(sites.len(), 4);
    assert_eq!(*sites, builtin_sites());
    assert_eq!(sites[2].technology, Technology::WindOffshore);
    assert!(sites.iter().all(|s| s.status == SiteStatus::Active));
}

#[tokio::test]
async fn live_feed_is_cached() {
    let feed_conn = mock("m-sites", &[Capability::Sites], MockBehavior::Return);
    let feed = feed_with(&[feed_conn.clone()]);

    let (sites, source) = feed.sites_with_source().await;
    assert_eq!(source, SiteSource::Live);
    let ids: Vec<_> = sites.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["mock-001", "mock-002"]);

    let (again, source) = feed.sites_with_source().await;
    assert_eq!(source, SiteSource::Cached);
    assert_eq!(again, sites);
    assert_eq!(feed_conn.calls(Capability::Sites), 1);
}

#[tokio::test]
async fn empty_or_failing_feeds_fall_back_to_static() {
    let empty = mock("m-empty", &[Capability::Sites], MockBehavior::Empty);
    let broken = failing(
        "m-broken",
        Capability::Sites,
        FetchError::network("m-broken", "connection reset"),
    );
    let observer = Arc::new(RecordingObserver::default());
    let feed = Gridfeed::builder()
        .with_connector(empty.clone() as Arc<dyn GridConnector>)
        .with_connector(broken.clone() as Arc<dyn GridConnector>)
        .observer(observer.clone())
        .build()
        .unwrap();

    let (sites, source) = feed.sites_with_source().await;
    assert_eq!(source, SiteSource::Static);
    assert_eq!(sites.len(), 4);
    assert_eq!(empty.calls(Capability::Sites), 1);
    assert_eq!(broken.calls(Capability::Sites), 1);
    assert_eq!(
        observer.events(),
        vec!["fail:sites:m-empty:Provider", "fail:sites:m-broken:Network"]
    );

    // the fallback is remembered until the sites TTL runs out
    let (again, source) = feed.sites_with_source().await;
    assert_eq!(source, SiteSource::Static);
    assert_eq!(again, sites);
    assert_eq!(empty.calls(Capability::Sites), 1);
    assert_eq!(broken.calls(Capability::Sites), 1);
    assert_eq!(observer.events().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn remembered_fallback_expires_with_the_sites_ttl() {
    let feed_conn = failing(
        "m-sites",
        Capability::Sites,
        FetchError::network("m-sites", "connection reset"),
    );
    let feed = feed_with(&[feed_conn.clone()]);

    assert_eq!(feed.sites_with_source().await.1, SiteSource::Static);
    tokio::time::advance(Duration::from_secs(24 * 3600 + 1)).await;
    feed_conn.set_behavior(Capability::Sites, MockBehavior::Return);

    let (sites, source) = feed.sites_with_source().await;
    assert_eq!(source, SiteSource::Live);
    assert_eq!(sites[0].id, "mock-001");
    assert_eq!(feed_conn.calls(Capability::Sites), 2);
}

#[tokio::test]
async fn site_outside_the_fallback_waits_for_the_feed() {
    let sites = mock("m-sites", &[Capability::Sites], MockBehavior::Return);
    let feed = feed_with(&[sites.clone()]);

    let bundle = feed
        .aggregate(&site_request("mock-001", MetricSet::PRICE))
        .await
        .unwrap();
    assert_eq!(bundle.site.id, "mock-001");
    assert_eq!(sites.calls(Capability::Sites), 1);
    assert_eq!(feed.sites_with_source().await.1, SiteSource::Cached);
}

#[tokio::test]
async fn custom_static_list_replaces_builtin() {
    let custom = vec![gridfeed::Site::ad_hoc(gridfeed::Coordinate::STOCKHOLM)];
    let feed = Gridfeed::builder()
        .force_synthetic(true)
        .static_sites(custom.clone())
        .build()
        .unwrap();
    assert_eq!(*feed.sites().await, custom);
    assert!(matches!(
        feed.site("site-001").await,
        Err(GridfeedError::UnknownSite { .. })
    ));
}

#[tokio::test]
async fn aggregation_uses_feed_metadata() {
    let sites = mock("m-sites", &[Capability::Sites], MockBehavior::Return);
    let weather = mock("m-weather", &[Capability::Weather], MockBehavior::Return);
    let feed = feed_with(&[sites, weather]);

    let bundle = feed
        .aggregate(&site_request("mock-002", MetricSet::WIND_SPEED))
        .await
        .unwrap();
    assert_eq!(bundle.site.name, "Mock Wind");
    assert_eq!(bundle.site.status, SiteStatus::Maintenance);
    assert!(bundle.is_fully_real());

    assert!(matches!(
        feed.site("site-001").await,
        Err(GridfeedError::UnknownSite { .. })
    ));
}
