use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gridfeed::{Capability, Gridfeed, GridConnector, Metric, MetricSet, Provenance, Resolution};
use gridfeed_core::connector::CarbonProvider;
use gridfeed_core::{FetchError, FetchQuery, PowerBreakdown, ProviderResult, TimeSeriesPoint};
use gridfeed_mock::MockBehavior;
use tokio::time::Instant;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn hanging_provider_is_cut_off_by_provider_timeout() {
    let market = mock("m-market", &[Capability::Market], MockBehavior::Hang);
    let carbon = mock("m-carbon", &[Capability::Carbon], MockBehavior::Return);
    let feed = Gridfeed::builder()
        .with_connector(market as Arc<dyn GridConnector>)
        .with_connector(carbon as Arc<dyn GridConnector>)
        .provider_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let started = Instant::now();
    let bundle = feed.aggregate(&site_request("site-001", all_metrics())).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");

    let outcome = &bundle.outcomes[&Capability::Market];
    assert_eq!(outcome.resolution, Resolution::Synthetic);
    assert!(outcome.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(bundle.provenance[&Metric::Price], Provenance::Synthetic);
    assert_eq!(bundle.provenance[&Metric::CarbonIntensity], Provenance::Real);
    // no weather connector registered at all
    assert_eq!(bundle.outcomes[&Capability::Weather].provider, None);
    assert_eq!(bundle.series[&Metric::Temperature].len(), 6);
}

#[tokio::test(start_paused = true)]
async fn request_timeout_bounds_each_capability() {
    let market = mock(
        "m-market",
        &[Capability::Market],
        MockBehavior::Delay(Duration::from_secs(5)),
    );
    let weather = mock("m-weather", &[Capability::Weather], MockBehavior::Return);
    let feed = Gridfeed::builder()
        .with_connector(market.clone() as Arc<dyn GridConnector>)
        .with_connector(weather as Arc<dyn GridConnector>)
        .provider_timeout(Duration::from_secs(10))
        .request_timeout(Duration::from_secs(3))
        .build()
        .unwrap();

    let started = Instant::now();
    let bundle = feed
        .aggregate(&stockholm_request(
            Capability::Market.metrics() | Capability::Weather.metrics(),
        ))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
    assert_eq!(market.calls(Capability::Market), 1);

    let outcome = &bundle.outcomes[&Capability::Market];
    assert_eq!(outcome.resolution, Resolution::Synthetic);
    assert!(outcome.error.as_deref().unwrap().starts_with("gridfeed: timed out"));
    assert_eq!(bundle.outcomes[&Capability::Weather].resolution, Resolution::Live);
    assert_eq!(bundle.provenance[&Metric::WindSpeed], Provenance::Real);
}

#[tokio::test(start_paused = true)]
async fn slow_but_timely_provider_stays_real() {
    let weather = mock(
        "m-weather",
        &[Capability::Weather],
        MockBehavior::Delay(Duration::from_millis(1500)),
    );
    let feed = Gridfeed::builder()
        .with_connector(weather as Arc<dyn GridConnector>)
        .provider_timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let bundle = feed
        .aggregate(&stockholm_request(Capability::Weather.metrics()))
        .await
        .unwrap();
    assert!(bundle.is_fully_real());
    assert_eq!(bundle.outcomes[&Capability::Weather].resolution, Resolution::Live);
}

#[tokio::test(start_paused = true)]
async fn hanging_site_feed_overlaps_series_fetches() {
    let sites = mock("m-sites", &[Capability::Sites], MockBehavior::Hang);
    let market = mock(
        "m-market",
        &[Capability::Market],
        MockBehavior::Delay(Duration::from_millis(1500)),
    );
    let feed = Gridfeed::builder()
        .with_connector(sites.clone() as Arc<dyn GridConnector>)
        .with_connector(market.clone() as Arc<dyn GridConnector>)
        .provider_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let req = site_request("site-001", Capability::Market.metrics());

    let started = Instant::now();
    let bundle = feed.aggregate(&req).await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1500), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(2500), "elapsed {elapsed:?}");
    assert_eq!(bundle.site.name, "Stockholm Solar Farm");
    assert_eq!(bundle.provenance[&Metric::Price], Provenance::Real);

    // the dead feed is remembered; nothing is refetched
    let started = Instant::now();
    let again = feed.aggregate(&req).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(again.outcomes[&Capability::Market].resolution, Resolution::Cached);
    assert_eq!(sites.calls(Capability::Sites), 1);
    assert_eq!(market.calls(Capability::Market), 1);
}

#[tokio::test(start_paused = true)]
async fn breakdown_is_fetched_alongside_carbon_intensity() {
    let carbon = Arc::new(SlowCarbon::default());
    let feed = Gridfeed::builder()
        .with_connector(carbon.clone() as Arc<dyn GridConnector>)
        .provider_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let req = stockholm_request(MetricSet::CARBON_INTENSITY);

    let started = Instant::now();
    let bundle = feed.aggregate(&req).await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "elapsed {elapsed:?}");
    assert_eq!(bundle.grid_mix.unwrap().provenance, Provenance::Real);

    let started = Instant::now();
    let again = feed.aggregate(&req).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(again.outcomes[&Capability::Carbon].resolution, Resolution::Cached);
    assert_eq!(again.grid_mix.unwrap().provenance, Provenance::Real);
    assert_eq!(carbon.breakdowns.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cached_carbon_never_calls_for_a_breakdown() {
    let carbon = Arc::new(SlowCarbon {
        breakdown_fails: true,
        ..SlowCarbon::default()
    });
    let feed = Gridfeed::builder()
        .with_connector(carbon.clone() as Arc<dyn GridConnector>)
        .build()
        .unwrap();
    let req = stockholm_request(MetricSet::CARBON_INTENSITY);

    let first = feed.aggregate(&req).await.unwrap();
    assert_eq!(first.provenance[&Metric::CarbonIntensity], Provenance::Real);
    assert_eq!(first.grid_mix.unwrap().provenance, Provenance::Synthetic);

    let second = feed.aggregate(&req).await.unwrap();
    assert_eq!(second.outcomes[&Capability::Carbon].resolution, Resolution::Cached);
    assert_eq!(second.grid_mix.unwrap().provenance, Provenance::Synthetic);
    assert_eq!(carbon.breakdowns.load(Ordering::SeqCst), 1);
}

/// Carbon connector whose two calls each take one second.
#[derive(Default)]
struct SlowCarbon {
    breakdowns: AtomicUsize,
    breakdown_fails: bool,
}

impl GridConnector for SlowCarbon {
    fn name(&self) -> &'static str {
        "slow-carbon"
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_carbon_provider(&self) -> Option<&dyn CarbonProvider> {
        Some(self as &dyn CarbonProvider)
    }
}

#[async_trait]
impl CarbonProvider for SlowCarbon {
    async fn carbon_intensity(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let points = query
            .window
            .hours()
            .map(|ts| TimeSeriesPoint::new(ts, Metric::CarbonIntensity, 42.0))
            .collect();
        Ok(ProviderResult::real(self.name(), query.signature(self.name()), points))
    }

    async fn power_breakdown(&self, query: &FetchQuery) -> Result<PowerBreakdown, FetchError> {
        self.breakdowns.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        if self.breakdown_fails {
            return Err(FetchError::provider(self.name(), "no breakdown"));
        }
        Ok(gridfeed_core::synthetic_breakdown("SE-SE3", query.window.start(), 7))
    }
}
