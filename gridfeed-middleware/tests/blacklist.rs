use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use gridfeed_core::{
    Capability, Coordinate, FetchError, FetchQuery, GridConnector, MetricSet, QuotaConfig,
    TimeWindow,
};
use gridfeed_middleware::{BlacklistingMiddleware, ConnectorBuilder};
use gridfeed_mock::{MockBehavior, MockConnector};

fn query() -> FetchQuery {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let w = TimeWindow::new(start, start + chrono::Duration::hours(1)).unwrap();
    FetchQuery::new(Coordinate::STOCKHOLM, w, MetricSet::PRICE)
}

#[tokio::test(start_paused = true)]
async fn rate_limit_benches_for_retry_hint() {
    let mock = Arc::new(MockConnector::new().with_behavior(
        Capability::Market,
        MockBehavior::Fail(FetchError::rate_limit("gridfeed-mock", Some(10_000))),
    ));
    let inner: Arc<dyn GridConnector> = mock.clone();
    let bl = BlacklistingMiddleware::new(inner, Duration::from_secs(300));
    let market = bl.as_market_provider().unwrap();

    assert!(market.market(&query()).await.is_err());
    assert_eq!(mock.calls(Capability::Market), 1);
    assert!(bl.is_blacklisted());

    mock.set_behavior(Capability::Market, MockBehavior::Return);
    let err = market.market(&query()).await.unwrap_err();
    assert!(matches!(err, FetchError::RateLimit { .. }));
    assert_eq!(mock.calls(Capability::Market), 1, "benched call skips inner");

    tokio::time::advance(Duration::from_secs(10)).await;
    assert!(market.market(&query()).await.is_ok());
    assert_eq!(mock.calls(Capability::Market), 2);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_uses_default_cooldown_and_keeps_kind() {
    let mock = Arc::new(MockConnector::new().with_behavior(
        Capability::Weather,
        MockBehavior::Fail(FetchError::auth("gridfeed-mock", 403)),
    ));
    let inner: Arc<dyn GridConnector> = mock.clone();
    let bl = BlacklistingMiddleware::new(inner, Duration::from_secs(60));
    let weather = bl.as_weather_provider().unwrap();
    let _ = weather.weather(&query()).await;
    let err = weather.weather(&query()).await.unwrap_err();
    assert!(matches!(err, FetchError::Auth { status: 403, .. }));
    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(!bl.is_blacklisted());
}

#[tokio::test(start_paused = true)]
async fn network_errors_do_not_bench() {
    let mock = Arc::new(MockConnector::new().with_behavior(
        Capability::Market,
        MockBehavior::Fail(FetchError::network("gridfeed-mock", "reset")),
    ));
    let inner: Arc<dyn GridConnector> = mock.clone();
    let bl = BlacklistingMiddleware::new(inner, Duration::from_secs(60));
    let _ = bl.as_market_provider().unwrap().market(&query()).await;
    let _ = bl.as_market_provider().unwrap().market(&query()).await;
    assert_eq!(mock.calls(Capability::Market), 2);
    assert!(!bl.is_blacklisted());
}

#[tokio::test(start_paused = true)]
async fn builder_puts_blacklist_outside_quota() {
    let mock = Arc::new(MockConnector::new());
    let raw: Arc<dyn GridConnector> = mock.clone();
    let builder = ConnectorBuilder::new(raw)
        .with_quota(&QuotaConfig {
            limit: 1,
            ..QuotaConfig::default()
        })
        .with_blacklist(Duration::from_secs(60));
    let names: Vec<_> = builder.describe().into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec!["BlacklistingMiddleware", "QuotaAwareConnector", "RawConnector"]
    );

    let wrapped = builder.build();
    let sites = wrapped.as_site_provider().unwrap();
    sites.sites().await.unwrap();
    assert!(matches!(sites.sites().await, Err(FetchError::RateLimit { .. })));
    assert_eq!(mock.calls(Capability::Sites), 1);
    assert_eq!(wrapped.name(), "gridfeed-mock");
}

#[test]
fn quota_limit_shortcut_keeps_window() {
    let raw: Arc<dyn GridConnector> = Arc::new(MockConnector::new());
    let b = ConnectorBuilder::new(raw).quota_limit(7);
    let (name, cfg) = &b.describe()[0];
    assert_eq!(*name, "QuotaAwareConnector");
    assert_eq!(cfg["limit"], 7);
    assert_eq!(cfg["utc_day"], true);
}
