//! ENTSO-E transparency platform connector: day-ahead prices, actual
//! generation per production type, and total load.

/// Bidding-zone and production-type tables.
pub mod codes;
/// XML time-series parser.
pub mod xml;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use gridfeed_core::connector::{ConnectorKey, GridConnector, MarketProvider};
use gridfeed_core::{
    Capability, FetchError, FetchQuery, Metric, ProviderResult, TimeSeriesPoint, TimeWindow,
    normalize, resample_to_hourly,
};
use url::Url;

use self::codes::{BiddingZone, PsrType};
use self::xml::{MarketSeries, flatten, parse_market_document};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Market document types requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    /// A44, day-ahead prices.
    DayAheadPrices,
    /// A75, actual generation per production type.
    ActualGeneration,
    /// A65, total load.
    TotalLoad,
}

impl DocumentType {
    /// The `documentType` code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DayAheadPrices => "A44",
            Self::ActualGeneration => "A75",
            Self::TotalLoad => "A65",
        }
    }

    /// The document that carries `metric`, if any.
    #[must_use]
    pub const fn for_metric(metric: Metric) -> Option<Self> {
        match metric {
            Metric::Price => Some(Self::DayAheadPrices),
            Metric::GenerationMw => Some(Self::ActualGeneration),
            Metric::LoadMw => Some(Self::TotalLoad),
            _ => None,
        }
    }
}

/// Format an instant as `yyyyMMddHH00` in UTC.
#[must_use]
pub fn format_period(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d%H00").to_string()
}

/// Connector for the ENTSO-E market feed.
pub struct EntsoeConnector {
    transport: Arc<dyn HttpTransport>,
    token: String,
    base: Url,
    zone: Option<BiddingZone>,
}

impl EntsoeConnector {
    /// Static connector key.
    pub const KEY: ConnectorKey = ConnectorKey::new("gridfeed-entsoe");

    /// Public API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://web-api.tp.entsoe.eu/api";

    /// Connector against the public endpoint using the production transport.
    ///
    /// # Errors
    /// Returns `Protocol` if the built-in endpoint cannot be parsed.
    pub fn new(token: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_transport(
            token,
            Self::DEFAULT_BASE_URL,
            Arc::new(ReqwestTransport::default()),
        )
    }

    /// Connector with an explicit endpoint and transport.
    ///
    /// # Errors
    /// Returns `Protocol` if `base_url` is not a valid URL.
    pub fn with_transport(
        token: impl Into<String>,
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, FetchError> {
        let base = Url::parse(base_url).map_err(|e| {
            FetchError::protocol(Self::KEY.as_str(), format!("bad base url {base_url}: {e}"))
        })?;
        Ok(Self {
            transport,
            token: token.into(),
            base,
            zone: None,
        })
    }

    /// Always query `zone`, whatever the coordinate.
    #[must_use]
    pub const fn with_zone(mut self, zone: BiddingZone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Zone used for a query at `query`'s coordinate.
    #[must_use]
    pub fn zone_for(&self, query: &FetchQuery) -> BiddingZone {
        self.zone
            .or_else(|| BiddingZone::for_coordinate(&query.coordinate))
            .unwrap_or(BiddingZone::DEFAULT)
    }

    /// Request for one document over `window`.
    #[must_use]
    pub fn request(
        &self,
        doc: DocumentType,
        zone: BiddingZone,
        window: &TimeWindow,
        psr: Option<PsrType>,
    ) -> HttpRequest {
        let mut url = self.base.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("securityToken", &self.token)
                .append_pair("documentType", doc.code());
            match doc {
                DocumentType::DayAheadPrices => {
                    q.append_pair("in_Domain", zone.eic())
                        .append_pair("out_Domain", zone.eic());
                }
                DocumentType::ActualGeneration => {
                    q.append_pair("processType", "A16")
                        .append_pair("in_Domain", zone.eic());
                    if let Some(psr) = psr {
                        q.append_pair("psrType", psr.code());
                    }
                }
                DocumentType::TotalLoad => {
                    q.append_pair("processType", "A16")
                        .append_pair("outBiddingZone_Domain", zone.eic());
                }
            }
            q.append_pair("periodStart", &format_period(window.start()))
                .append_pair("periodEnd", &format_period(window.end()));
        }
        HttpRequest::get(url)
    }

    /// Fetch and parse one document.
    ///
    /// # Errors
    /// Any transport, status, or document failure.
    pub async fn document(
        &self,
        doc: DocumentType,
        zone: BiddingZone,
        window: &TimeWindow,
        psr: Option<PsrType>,
    ) -> Result<Vec<MarketSeries>, FetchError> {
        let name = self.name();
        let request = self.request(doc, zone, window, psr);
        let body = self.transport.get(name, request).await?.into_body(name)?;
        parse_market_document(name, &body)
    }

    async fn metric_points(
        &self,
        metric: Metric,
        zone: BiddingZone,
        query: &FetchQuery,
    ) -> Result<Vec<TimeSeriesPoint>, FetchError> {
        let Some(doc) = DocumentType::for_metric(metric) else {
            return Ok(Vec::new());
        };
        let psr = query.technology.and_then(PsrType::for_technology);
        let series = self.document(doc, zone, &query.window, psr).await;
        #[cfg(feature = "tracing")]
        if let Err(e) = &series {
            tracing::warn!(metric = %metric, zone = %zone, error = %e, "market document failed");
        }
        let series = series?;
        let raw = match doc {
            // Without a psrType filter there is one series per production type.
            DocumentType::ActualGeneration => sum_by_instant(&series),
            _ => flatten(&series),
        };
        let points: Vec<_> = raw
            .into_iter()
            .map(|(at, v)| TimeSeriesPoint::new(at, metric, v))
            .collect();
        Ok(resample_to_hourly(&points))
    }
}

fn sum_by_instant(series: &[MarketSeries]) -> Vec<(DateTime<Utc>, f64)> {
    let mut totals: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
    for (at, v) in series.iter().flat_map(|s| s.points.iter()) {
        *totals.entry(*at).or_insert(0.0) += v;
    }
    totals.into_iter().collect()
}

impl GridConnector for EntsoeConnector {
    fn name(&self) -> &'static str {
        Self::KEY.as_str()
    }

    fn vendor(&self) -> &'static str {
        "ENTSO-E"
    }

    fn as_market_provider(&self) -> Option<&dyn MarketProvider> {
        Some(self as &dyn MarketProvider)
    }
}

#[async_trait]
impl MarketProvider for EntsoeConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "gridfeed_providers::entsoe::market",
            skip(self, query),
            fields(window_start = %query.window.start(), hours = query.window.hour_count()),
        )
    )]
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let zone = self.zone_for(query);
        let metrics: Vec<Metric> = (query.metrics & Capability::Market.metrics())
            .metrics()
            .collect();
        let outcomes = join_all(
            metrics
                .iter()
                .map(|m| self.metric_points(*m, zone, query)),
        )
        .await;

        let mut points = Vec::new();
        let mut first_err = None;
        for outcome in outcomes {
            match outcome {
                Ok(mut p) => points.append(&mut p),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        // Partial success is still success; missing metrics are filled downstream.
        if points.is_empty()
            && let Some(err) = first_err
        {
            return Err(err);
        }
        Ok(ProviderResult::real(
            self.name(),
            query.signature(self.name()),
            normalize(points),
        ))
    }
}
