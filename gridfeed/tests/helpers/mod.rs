// Shared fixtures so tests can `use helpers::*;`
#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use gridfeed::{
    AggregateRequest, AggregationObserver, Capability, Coordinate, FetchError, Gridfeed,
    GridConnector, MetricSet, TimeWindow,
};
use gridfeed_mock::{MockBehavior, MockConnector};

/// Construct a UTC `DateTime` from components for readability in tests.
pub fn dt(y: i32, m: u32, d: u32, hh: u32) -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc.with_ymd_and_hms(y, m, d, hh, 0, 0).unwrap()
}

/// Six hours on 2024-06-01, 06:00 to 12:00 UTC.
pub fn morning() -> TimeWindow {
    TimeWindow::new(dt(2024, 6, 1, 6), dt(2024, 6, 1, 12)).unwrap()
}

/// Every metric the aggregator can serve.
pub fn all_metrics() -> MetricSet {
    Capability::Market.metrics() | Capability::Carbon.metrics() | Capability::Weather.metrics()
}

pub fn site_request(id: &str, metrics: MetricSet) -> AggregateRequest {
    AggregateRequest::site(id, morning(), metrics)
}

pub fn stockholm_request(metrics: MetricSet) -> AggregateRequest {
    AggregateRequest::coordinate(Coordinate::STOCKHOLM, morning(), metrics)
}

/// A mock serving only `roles`, with the same behavior on each.
pub fn mock(name: &'static str, roles: &[Capability], behavior: MockBehavior) -> Arc<MockConnector> {
    let m = MockConnector::named(name, roles);
    for cap in roles {
        m.set_behavior(*cap, behavior.clone());
    }
    Arc::new(m)
}

pub fn failing(name: &'static str, cap: Capability, err: FetchError) -> Arc<MockConnector> {
    mock(name, &[cap], MockBehavior::Fail(err))
}

pub fn feed_with(connectors: &[Arc<MockConnector>]) -> Gridfeed {
    connectors
        .iter()
        .fold(Gridfeed::builder(), |b, c| {
            b.with_connector(Arc::clone(c) as Arc<dyn GridConnector>)
        })
        .provider_timeout(Duration::from_secs(10))
        .build()
        .expect("gridfeed builds")
}

/// Observer that records events as short strings.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: String) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl AggregationObserver for RecordingObserver {
    fn on_cache_hit(&self, capability: Capability, _signature: &gridfeed::QuerySignature) {
        self.push(format!("hit:{capability}"));
    }

    fn on_fetch_succeeded(
        &self,
        capability: Capability,
        connector: &str,
        _latency: Duration,
        _points: usize,
    ) {
        self.push(format!("ok:{capability}:{connector}"));
    }

    fn on_fetch_failed(&self, capability: Capability, connector: &str, error: &FetchError) {
        self.push(format!("fail:{capability}:{connector}:{:?}", error.kind()));
    }

    fn on_synthesized(&self, capability: Capability, _points: usize) {
        self.push(format!("synth:{capability}"));
    }
}
