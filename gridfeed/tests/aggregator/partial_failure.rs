use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridfeed::{
    Capability, FetchError, FetchQuery, Gridfeed, GridConnector, Metric, MetricSet, Provenance,
    ProviderResult, Resolution, TimeSeriesPoint,
};
use gridfeed_core::connector::MarketProvider;
use gridfeed_mock::{MockBehavior, fixture_value};
use tokio::time::Instant;

use crate::helpers::*;

#[tokio::test]
async fn one_failing_provider_leaves_the_others_real() {
    let market = failing("m-market", Capability::Market, FetchError::auth("m-market", 401));
    let carbon = mock("m-carbon", &[Capability::Carbon], MockBehavior::Return);
    let weather = mock("m-weather", &[Capability::Weather], MockBehavior::Return);
    let feed = feed_with(&[market.clone(), carbon.clone(), weather.clone()]);

    let bundle = feed
        .aggregate(&site_request("site-001", all_metrics()))
        .await
        .expect("aggregation never fails on provider errors");

    assert_eq!(bundle.site.name, "Stockholm Solar Farm");
    assert_eq!(bundle.series.len(), 9);
    for (metric, points) in &bundle.series {
        assert_eq!(points.len(), 6, "full-length series for {metric}");
    }
    for m in Capability::Market.metrics().metrics() {
        assert_eq!(bundle.provenance[&m], Provenance::Synthetic);
    }
    for m in (Capability::Carbon.metrics() | Capability::Weather.metrics()).metrics() {
        assert_eq!(bundle.provenance[&m], Provenance::Real);
    }
    assert!(
        bundle.series[&Metric::Temperature]
            .iter()
            .all(|p| p.value == 15.0)
    );

    let outcome = &bundle.outcomes[&Capability::Market];
    assert_eq!(outcome.resolution, Resolution::Synthetic);
    assert_eq!(outcome.provider.as_deref(), Some("m-market"));
    assert!(outcome.error.as_deref().unwrap().contains("authorization failed"));
    assert_eq!(bundle.outcomes[&Capability::Carbon].resolution, Resolution::Live);
    assert_eq!(bundle.outcomes[&Capability::Weather].resolution, Resolution::Live);

    let mix = bundle.grid_mix.expect("carbon requested");
    assert_eq!(mix.provenance, Provenance::Real);
    assert_eq!(mix.breakdown.zone, "SE-SE3");
}

#[tokio::test]
async fn only_real_results_are_cached() {
    let market = failing("m-market", Capability::Market, FetchError::network("m-market", "reset"));
    let carbon = mock("m-carbon", &[Capability::Carbon], MockBehavior::Return);
    let feed = feed_with(&[market.clone(), carbon.clone()]);
    let req = site_request("site-002", MetricSet::PRICE | MetricSet::CARBON_INTENSITY);

    feed.aggregate(&req).await.unwrap();
    let second = feed.aggregate(&req).await.unwrap();

    assert_eq!(market.calls(Capability::Market), 2, "synthetic data is not cached");
    assert_eq!(carbon.calls(Capability::Carbon), 1, "real data is served from cache");
    assert_eq!(second.outcomes[&Capability::Carbon].resolution, Resolution::Cached);
    assert_eq!(
        second.outcomes[&Capability::Carbon].provider.as_deref(),
        Some("m-carbon")
    );
}

#[tokio::test]
async fn connectors_are_tried_in_registration_order() {
    let first = failing("first", Capability::Market, FetchError::network("first", "refused"));
    let second = mock("second", &[Capability::Market], MockBehavior::Return);
    let observer = Arc::new(RecordingObserver::default());
    let feed = Gridfeed::builder()
        .with_connector(first.clone())
        .with_connector(second.clone())
        .observer(observer.clone())
        .build()
        .unwrap();

    let bundle = feed
        .aggregate(&stockholm_request(MetricSet::PRICE))
        .await
        .unwrap();

    assert_eq!(bundle.provenance[&Metric::Price], Provenance::Real);
    assert_eq!(
        bundle.outcomes[&Capability::Market].provider.as_deref(),
        Some("second")
    );
    assert_eq!(
        observer.events(),
        vec!["fail:market:first:Network", "ok:market:second"]
    );
}

#[tokio::test]
async fn empty_answer_is_synthesized() {
    let weather = mock("m-weather", &[Capability::Weather], MockBehavior::Empty);
    let feed = feed_with(&[weather]);
    let bundle = feed
        .aggregate(&stockholm_request(MetricSet::TEMPERATURE))
        .await
        .unwrap();
    assert_eq!(bundle.provenance[&Metric::Temperature], Provenance::Synthetic);
    assert_eq!(bundle.series[&Metric::Temperature].len(), 6);
    let outcome = &bundle.outcomes[&Capability::Weather];
    assert!(outcome.error.as_deref().unwrap().contains("no data points"));
}

/// Serves prices only, whatever else is asked for.
struct PriceOnly;

impl GridConnector for PriceOnly {
    fn name(&self) -> &'static str {
        "price-only"
    }

    fn as_market_provider(&self) -> Option<&dyn MarketProvider> {
        Some(self as &dyn MarketProvider)
    }
}

#[async_trait]
impl MarketProvider for PriceOnly {
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let points = query
            .window
            .hours()
            .map(|ts| TimeSeriesPoint::new(ts, Metric::Price, fixture_value(Metric::Price, ts)))
            .collect();
        Ok(ProviderResult::real(
            self.name(),
            query.signature(self.name()),
            points,
        ))
    }
}

#[tokio::test]
async fn missing_metrics_of_a_real_result_are_filled() {
    let feed = Gridfeed::builder()
        .with_connector(Arc::new(PriceOnly))
        .build()
        .unwrap();
    let bundle = feed
        .aggregate(&stockholm_request(Capability::Market.metrics()))
        .await
        .unwrap();

    assert_eq!(bundle.provenance[&Metric::Price], Provenance::Real);
    assert_eq!(bundle.provenance[&Metric::LoadMw], Provenance::Synthetic);
    assert_eq!(bundle.provenance[&Metric::GenerationMw], Provenance::Synthetic);
    assert_eq!(bundle.series[&Metric::LoadMw].len(), 6);
    assert_eq!(bundle.outcomes[&Capability::Market].resolution, Resolution::Live);
    assert!(!bundle.is_fully_real());
}

#[tokio::test(start_paused = true)]
async fn dead_site_feed_does_not_taint_the_series() {
    let sites = mock("m-sites", &[Capability::Sites], MockBehavior::Hang);
    let market = mock("m-market", &[Capability::Market], MockBehavior::Return);
    let carbon = mock("m-carbon", &[Capability::Carbon], MockBehavior::Return);
    let weather = mock("m-weather", &[Capability::Weather], MockBehavior::Return);
    let observer = Arc::new(RecordingObserver::default());
    let feed = [&sites, &market, &carbon, &weather]
        .into_iter()
        .fold(Gridfeed::builder(), |b, c| {
            b.with_connector(Arc::clone(c) as Arc<dyn GridConnector>)
        })
        .provider_timeout(Duration::from_secs(2))
        .observer(observer.clone())
        .build()
        .unwrap();

    let started = Instant::now();
    let bundle = feed
        .aggregate(&site_request("site-002", all_metrics()))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed <= Duration::from_secs(2), "elapsed {elapsed:?}");
    assert!(bundle.is_fully_real());
    assert_eq!(bundle.site.name, "Gotland Wind Farm");
    for cap in [Capability::Market, Capability::Carbon, Capability::Weather] {
        assert_eq!(bundle.outcomes[&cap].resolution, Resolution::Live);
    }
    assert!(
        observer
            .events()
            .contains(&"fail:sites:m-sites:Network".to_string())
    );
}
