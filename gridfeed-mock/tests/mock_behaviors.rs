use std::time::Duration;

use chrono::{TimeZone, Utc};
use gridfeed_core::{
    Capability, Coordinate, FetchError, FetchQuery, GridConnector, MetricSet, TimeWindow,
};
use gridfeed_mock::{MockBehavior, MockConnector};

fn query() -> FetchQuery {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let w = TimeWindow::new(start, start + chrono::Duration::hours(3)).unwrap();
    FetchQuery::new(Coordinate::STOCKHOLM, w, MetricSet::PRICE | MetricSet::TEMPERATURE)
}

#[tokio::test]
async fn returns_only_the_role_metrics() {
    let m = MockConnector::new();
    let r = m.as_market_provider().unwrap().market(&query()).await.unwrap();
    assert_eq!(r.metrics(), MetricSet::PRICE);
    assert_eq!(r.points.len(), 3);
    assert!(r.is_real());
    assert_eq!(m.calls(Capability::Market), 1);
    assert_eq!(m.calls(Capability::Weather), 0);
}

#[tokio::test]
async fn fail_behavior_is_counted_and_returned() {
    let m = MockConnector::new().with_behavior(
        Capability::Weather,
        MockBehavior::Fail(FetchError::auth("gridfeed-mock", 401)),
    );
    let err = m.as_weather_provider().unwrap().weather(&query()).await.unwrap_err();
    assert!(matches!(err, FetchError::Auth { status: 401, .. }));
    assert_eq!(m.calls(Capability::Weather), 1);
}

#[tokio::test]
async fn roles_can_be_restricted() {
    let m = MockConnector::named("carbon-only", &[Capability::Carbon]);
    assert!(m.as_market_provider().is_none());
    assert!(m.supports(Capability::Carbon));
    assert_eq!(m.name(), "carbon-only");
}

#[tokio::test(start_paused = true)]
async fn delay_behavior_sleeps_before_answering() {
    let m = MockConnector::new().with_behavior(
        Capability::Market,
        MockBehavior::Delay(Duration::from_secs(5)),
    );
    let started = tokio::time::Instant::now();
    let r = m.as_market_provider().unwrap().market(&query()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(r.points.len(), 3);
}
