//! The aggregator.
//!
//! One aggregation resolves each requested capability independently and
//! concurrently: cache first, then each eligible connector in registration
//! order under the provider timeout, then the synthesizer. A capability never
//! fails; it resolves to cached, live, or synthetic data, and the bundle says
//! which.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use futures::future::{join, join_all};
use tokio::time::Instant;

use gridfeed_core::connector::GridConnector;
use gridfeed_core::{
    Bundle, Capability, Coordinate, FetchError, FetchQuery, GridMix, GridfeedError, Metric,
    MetricSet, PowerBreakdown, Provenance, ProviderOutcome, ProviderResult, Resolution,
    SYNTH_PROVIDER, SeriesPoint, Site, TimeWindow, normalize, restrict, synthesize,
    synthesize_metric, synthetic_breakdown,
};
use gridfeed_providers::entsoe::codes::BiddingZone;

use crate::core::Gridfeed;

/// Capabilities that carry time series, in fan-out order.
const SERIES_CAPABILITIES: [Capability; 3] =
    [Capability::Market, Capability::Carbon, Capability::Weather];

/// What an aggregation is about.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A registered site, by id.
    Site(String),
    /// An arbitrary location with no site metadata.
    Coordinate(Coordinate),
}

/// Parameters of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    /// Site or location.
    pub target: Target,
    /// Time window; widened to whole hours.
    pub window: TimeWindow,
    /// Metrics to return.
    pub metrics: MetricSet,
}

impl AggregateRequest {
    /// Request for a registered site.
    #[must_use]
    pub fn site(id: impl Into<String>, window: TimeWindow, metrics: MetricSet) -> Self {
        Self {
            target: Target::Site(id.into()),
            window,
            metrics,
        }
    }

    /// Request for an explicit coordinate.
    #[must_use]
    pub const fn coordinate(coordinate: Coordinate, window: TimeWindow, metrics: MetricSet) -> Self {
        Self {
            target: Target::Coordinate(coordinate),
            window,
            metrics,
        }
    }
}

/// One capability after resolution.
struct Resolved {
    capability: Capability,
    metrics: MetricSet,
    real: Option<Arc<ProviderResult>>,
    synthetic: Option<ProviderResult>,
    grid_mix: Option<GridMix>,
    outcome: ProviderOutcome,
}

impl Gridfeed {
    /// Assemble a bundle for `request`.
    ///
    /// Connector failures, timeouts and empty answers are absorbed: every
    /// requested metric comes back as a series, tagged real or synthetic.
    ///
    /// # Errors
    /// `InvalidArg` when no metric is requested; `UnknownSite` when the site id
    /// is not in the registry.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "gridfeed::aggregate",
            skip(self, request),
            fields(target = ?request.target, metrics = %request.metrics.bits()),
        )
    )]
    pub async fn aggregate(&self, request: &AggregateRequest) -> Result<Bundle, GridfeedError> {
        if request.metrics.is_empty() {
            return Err(GridfeedError::InvalidArg("no metrics requested".into()));
        }
        let (site, technology, refresh_sites) = match &request.target {
            Target::Site(id) => {
                let (site, refresh) = self.locate_site(id).await?;
                let tech = site.technology;
                (site, Some(tech), refresh)
            }
            Target::Coordinate(c) => (Site::ad_hoc(*c), None, false),
        };
        let query = FetchQuery::new(site.coordinate, request.window, request.metrics)
            .with_site(site.capacity(), technology)
            .with_precision(self.cfg.location_precision);

        let tasks = SERIES_CAPABILITIES.into_iter().filter_map(|cap| {
            let metrics = query.metrics & cap.metrics();
            (!metrics.is_empty())
                .then(|| self.resolve_with_deadline(cap, query.for_metrics(metrics)))
        });
        // A cold site cache is refilled next to the series fetches, not before them.
        let (resolved, ()) = join(join_all(tasks), async {
            if refresh_sites {
                self.refresh_sites().await;
            }
        })
        .await;

        let mut bundle = Bundle {
            site,
            series: BTreeMap::new(),
            provenance: BTreeMap::new(),
            fetched_at: Utc::now(),
            grid_mix: None,
            outcomes: BTreeMap::new(),
        };
        for r in resolved {
            for metric in r.metrics.metrics() {
                let (points, provenance) = r.series(metric);
                bundle.series.insert(metric, points);
                bundle.provenance.insert(metric, provenance);
            }
            if r.grid_mix.is_some() {
                bundle.grid_mix = r.grid_mix;
            }
            bundle.outcomes.insert(r.capability, r.outcome);
        }
        Ok(bundle)
    }

    async fn resolve_with_deadline(&self, cap: Capability, query: FetchQuery) -> Resolved {
        let Some(limit) = self.cfg.request_timeout else {
            return self.resolve(cap, &query).await;
        };
        match tokio::time::timeout(limit, self.resolve(cap, &query)).await {
            Ok(resolved) => resolved,
            Err(_) => {
                let err = FetchError::timeout("gridfeed", limit);
                self.synthesized(cap, &query, None, Some(err))
            }
        }
    }

    async fn resolve(&self, cap: Capability, query: &FetchQuery) -> Resolved {
        if self.cfg.force_synthetic {
            return self.synthesized(cap, query, None, None);
        }
        let candidates = self.eligible(cap);

        for c in &candidates {
            let signature = query.signature(c.name());
            if let Some(hit) = self.cache.get(cap, &signature).await {
                self.observer.on_cache_hit(cap, &signature);
                let grid_mix = if cap == Capability::Carbon {
                    Some(self.cached_mix(query, &hit.provider).await)
                } else {
                    None
                };
                return self.from_real(cap, query, hit, Resolution::Cached, grid_mix);
            }
        }

        let mut last_failure: Option<(&'static str, FetchError)> = None;
        for c in &candidates {
            let started = Instant::now();
            let (fetched, breakdown) = if cap == Capability::Carbon {
                let (fetched, breakdown) =
                    join(self.fetch(c.as_ref(), cap, query), self.breakdown(c.as_ref(), query))
                        .await;
                (fetched, Some(breakdown))
            } else {
                (self.fetch(c.as_ref(), cap, query).await, None)
            };
            match fetched {
                Ok(result) => {
                    self.observer.on_fetch_succeeded(
                        cap,
                        c.name(),
                        started.elapsed(),
                        result.points.len(),
                    );
                    let result = Arc::new(result);
                    self.cache.put(cap, Arc::clone(&result)).await;
                    let grid_mix = match breakdown {
                        Some(Ok(breakdown)) => Some(GridMix::new(breakdown, Provenance::Real)),
                        Some(Err(e)) => {
                            self.observer.on_fetch_failed(cap, c.name(), &e);
                            Some(synthetic_mix(query))
                        }
                        None => None,
                    };
                    return self.from_real(cap, query, result, Resolution::Live, grid_mix);
                }
                Err(e) => {
                    self.observer.on_fetch_failed(cap, c.name(), &e);
                    last_failure = Some((c.name(), e));
                }
            }
        }
        let (provider, err) = last_failure.unzip();
        self.synthesized(cap, query, provider, err)
    }

    /// One connector call, trimmed to the window and metrics asked for.
    ///
    /// A result with no usable point counts as a failure.
    async fn fetch(
        &self,
        c: &dyn GridConnector,
        cap: Capability,
        query: &FetchQuery,
    ) -> Result<ProviderResult, FetchError> {
        let name = c.name();
        let unsupported = || FetchError::unsupported(name, cap.as_str());
        let call = async {
            match cap {
                Capability::Market => {
                    c.as_market_provider()
                        .ok_or_else(unsupported)?
                        .market(query)
                        .await
                }
                Capability::Carbon => {
                    c.as_carbon_provider()
                        .ok_or_else(unsupported)?
                        .carbon_intensity(query)
                        .await
                }
                Capability::Weather => {
                    c.as_weather_provider()
                        .ok_or_else(unsupported)?
                        .weather(query)
                        .await
                }
                Capability::Sites => Err(unsupported()),
            }
        };
        let mut result =
            Self::provider_call_with_timeout(name, cap, self.cfg.provider_timeout, call).await?;
        let points = std::mem::take(&mut result.points);
        result.points = normalize(restrict(points, &query.window, query.metrics));
        if result.points.is_empty() {
            return Err(FetchError::provider(name, "no data points in the requested window"));
        }
        result.signature = query.signature(name);
        Ok(result)
    }

    fn from_real(
        &self,
        cap: Capability,
        query: &FetchQuery,
        result: Arc<ProviderResult>,
        resolution: Resolution,
        grid_mix: Option<GridMix>,
    ) -> Resolved {
        let missing = query.metrics - result.metrics();
        let synthetic = (!missing.is_empty()).then(|| {
            // Same seed as a full synthesis of the query, so filled metrics match it.
            let seed = query.signature(SYNTH_PROVIDER).seed();
            let signature = query.for_metrics(missing).signature(SYNTH_PROVIDER);
            let points = missing
                .metrics()
                .flat_map(|m| synthesize_metric(m, query, seed))
                .collect::<Vec<_>>();
            self.observer.on_synthesized(cap, points.len());
            ProviderResult::synthetic(SYNTH_PROVIDER, signature, points)
        });
        Resolved {
            capability: cap,
            metrics: query.metrics,
            outcome: ProviderOutcome {
                provider: Some(result.provider.clone()),
                resolution,
                error: None,
            },
            real: Some(result),
            synthetic,
            grid_mix,
        }
    }

    fn synthesized(
        &self,
        cap: Capability,
        query: &FetchQuery,
        provider: Option<&str>,
        err: Option<FetchError>,
    ) -> Resolved {
        let mut result = synthesize(query, query.signature(SYNTH_PROVIDER));
        if let Some(e) = &err {
            result = result.with_error(e.clone());
        }
        self.observer.on_synthesized(cap, result.points.len());
        Resolved {
            capability: cap,
            metrics: query.metrics,
            real: None,
            synthetic: Some(result),
            grid_mix: (cap == Capability::Carbon).then(|| synthetic_mix(query)),
            outcome: ProviderOutcome {
                provider: provider.map(str::to_string),
                resolution: Resolution::Synthetic,
                error: err.map(|e| e.to_string()),
            },
        }
    }

    /// Power breakdown for a live carbon call, issued alongside it.
    ///
    /// Successful breakdowns are cached under the connector's signature.
    async fn breakdown(
        &self,
        c: &dyn GridConnector,
        query: &FetchQuery,
    ) -> Result<PowerBreakdown, FetchError> {
        let carbon = c
            .as_carbon_provider()
            .ok_or_else(|| FetchError::unsupported(c.name(), Capability::Carbon.as_str()))?;
        let breakdown = Self::provider_call_with_timeout(
            c.name(),
            Capability::Carbon,
            self.cfg.provider_timeout,
            carbon.power_breakdown(query),
        )
        .await?;
        self.cache
            .put_breakdown(query.signature(c.name()), Arc::new(breakdown.clone()))
            .await;
        Ok(breakdown)
    }

    /// Grid mix for cached carbon intensity: the cached breakdown when there
    /// is one, the synthetic mix otherwise. Never calls a connector.
    async fn cached_mix(&self, query: &FetchQuery, provider: &str) -> GridMix {
        match self.cache.get_breakdown(&query.signature(provider)).await {
            Some(hit) => GridMix::new((*hit).clone(), Provenance::Real),
            None => synthetic_mix(query),
        }
    }
}

fn synthetic_mix(query: &FetchQuery) -> GridMix {
    let zone = BiddingZone::for_coordinate(&query.coordinate).unwrap_or(BiddingZone::DEFAULT);
    let at = query.window.end() - TimeDelta::hours(1);
    let seed = query.signature(SYNTH_PROVIDER).seed();
    GridMix::new(
        synthetic_breakdown(zone.carbon_zone(), at.max(query.window.start()), seed),
        Provenance::Synthetic,
    )
}

impl Resolved {
    /// Series for `metric`: real points when the connector delivered any,
    /// synthetic otherwise.
    fn series(&self, metric: Metric) -> (Vec<SeriesPoint>, Provenance) {
        let real: Vec<SeriesPoint> = self
            .real
            .iter()
            .flat_map(|r| r.series(metric))
            .map(SeriesPoint::from)
            .collect();
        if !real.is_empty() {
            return (real, Provenance::Real);
        }
        let synthetic = self
            .synthetic
            .iter()
            .flat_map(|r| r.series(metric))
            .map(SeriesPoint::from)
            .collect();
        (synthetic, Provenance::Synthetic)
    }
}
