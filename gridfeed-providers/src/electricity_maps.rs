//! Electricity Maps connector: carbon intensity and power breakdown.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use gridfeed_core::connector::{CarbonProvider, ConnectorKey, GridConnector};
use gridfeed_core::{
    EnergySource, FetchError, FetchQuery, Metric, PowerBreakdown, ProviderResult,
    TimeSeriesPoint, normalize,
};
use serde::Deserialize;
use url::Url;

use crate::candidates::{DEFAULT_MAX_ATTEMPTS, first_success};
use crate::entsoe::codes::BiddingZone;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::wire::parse_instant;

/// One carbon-intensity reading.
///
/// Both `carbonIntensity` and the older `intensity` spelling are accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Reading {
    #[serde(alias = "intensity")]
    carbon_intensity: Option<f64>,
    datetime: String,
}

#[derive(Debug, Deserialize)]
struct History {
    history: Vec<Reading>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreakdownPayload {
    zone: Option<String>,
    datetime: String,
    power_production_breakdown: Option<BTreeMap<String, Option<f64>>>,
    power_consumption_breakdown: Option<BTreeMap<String, Option<f64>>>,
}

fn decode<'de, T: Deserialize<'de>>(provider: &str, body: &'de str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::protocol(provider, format!("invalid JSON: {e}")))
}

fn reading_point(provider: &str, r: &Reading) -> Result<Option<TimeSeriesPoint>, FetchError> {
    let at = parse_instant(&r.datetime)
        .ok_or_else(|| FetchError::protocol(provider, format!("bad datetime: {}", r.datetime)))?;
    Ok(r
        .carbon_intensity
        .map(|v| TimeSeriesPoint::new(at, Metric::CarbonIntensity, v)))
}

/// Parse a `/carbon-intensity/latest` payload into one point.
///
/// # Errors
/// `Protocol` when the payload is not JSON, has no intensity value, or has an
/// unreadable `datetime`.
pub fn parse_latest(provider: &str, body: &str) -> Result<TimeSeriesPoint, FetchError> {
    let reading: Reading = decode(provider, body)?;
    reading_point(provider, &reading)?
        .ok_or_else(|| FetchError::protocol(provider, "reading without carbonIntensity"))
}

/// Parse a `/carbon-intensity/history` payload.
///
/// Entries with a null intensity are skipped.
///
/// # Errors
/// `Protocol` for malformed payloads; `Provider` when no entry carries a value.
pub fn parse_history(provider: &str, body: &str) -> Result<Vec<TimeSeriesPoint>, FetchError> {
    let history: History = decode(provider, body)?;
    let mut points = Vec::with_capacity(history.history.len());
    for r in &history.history {
        if let Some(p) = reading_point(provider, r)? {
            points.push(p);
        }
    }
    if points.is_empty() {
        return Err(FetchError::provider(provider, "history contains no readings"));
    }
    Ok(normalize(points))
}

/// Parse a `/power-breakdown/latest` payload.
///
/// Production figures are preferred; consumption figures are used when the
/// zone reports no production breakdown. Null sources are dropped.
///
/// # Errors
/// `Protocol` for malformed payloads or when neither breakdown is present.
pub fn parse_breakdown(
    provider: &str,
    fallback_zone: &str,
    body: &str,
) -> Result<PowerBreakdown, FetchError> {
    let payload: BreakdownPayload = decode(provider, body)?;
    let at = parse_instant(&payload.datetime).ok_or_else(|| {
        FetchError::protocol(provider, format!("bad datetime: {}", payload.datetime))
    })?;
    let figures = payload
        .power_production_breakdown
        .or(payload.power_consumption_breakdown)
        .ok_or_else(|| FetchError::protocol(provider, "payload without a power breakdown"))?;
    let zone = payload.zone.unwrap_or_else(|| fallback_zone.to_string());
    Ok(PowerBreakdown::new(
        zone,
        at,
        figures
            .into_iter()
            .filter_map(|(key, mw)| Some((EnergySource::from_key(&key), mw?))),
    ))
}

/// Connector for the Electricity Maps v3 API.
pub struct ElectricityMapsConnector {
    transport: Arc<dyn HttpTransport>,
    token: String,
    base: Url,
    zone: Option<String>,
}

impl ElectricityMapsConnector {
    /// Static connector key.
    pub const KEY: ConnectorKey = ConnectorKey::new("gridfeed-electricitymaps");

    /// Public API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.electricitymap.org/v3";

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
        // A trailing slash makes `join` append rather than replace the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalized).map_err(|e| {
            FetchError::protocol(Self::KEY.as_str(), format!("bad base url {base_url}: {e}"))
        })?;
        Ok(Self {
            transport,
            token: token.into(),
            base,
            zone: None,
        })
    }

    /// Always query `zone` (a carbon-feed zone code such as `SE`), whatever the coordinate.
    #[must_use]
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Zone code used for `query`.
    #[must_use]
    pub fn zone_for(&self, query: &FetchQuery) -> String {
        self.zone.clone().unwrap_or_else(|| {
            BiddingZone::for_coordinate(&query.coordinate)
                .unwrap_or(BiddingZone::DEFAULT)
                .carbon_zone()
                .to_string()
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<HttpRequest, FetchError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| FetchError::protocol(self.name(), format!("bad endpoint {path}: {e}")))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(HttpRequest::get(url).with_header("auth-token", self.token.clone()))
    }

    async fn get(&self, request: HttpRequest) -> Result<String, FetchError> {
        let name = self.name();
        self.transport.get(name, request).await?.into_body(name)
    }

    /// Candidate requests for an intensity query: history for the window, then latest.
    fn intensity_candidates(&self, query: &FetchQuery) -> Result<Vec<IntensityCall>, FetchError> {
        let zone = self.zone_for(query);
        let start = query.window.start().to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = query.window.end().to_rfc3339_opts(SecondsFormat::Secs, true);
        Ok(vec![
            IntensityCall::History(self.endpoint(
                "carbon-intensity/history",
                &[("zone", zone.as_str()), ("start", start.as_str()), ("end", end.as_str())],
            )?),
            IntensityCall::Latest(self.endpoint("carbon-intensity/latest", &[("zone", zone.as_str())])?),
        ])
    }
}

enum IntensityCall {
    History(HttpRequest),
    Latest(HttpRequest),
}

impl GridConnector for ElectricityMapsConnector {
    fn name(&self) -> &'static str {
        Self::KEY.as_str()
    }

    fn vendor(&self) -> &'static str {
        "Electricity Maps"
    }

    fn as_carbon_provider(&self) -> Option<&dyn CarbonProvider> {
        Some(self as &dyn CarbonProvider)
    }
}

#[async_trait]
impl CarbonProvider for ElectricityMapsConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "gridfeed_providers::electricity_maps::carbon_intensity",
            skip(self, query),
        )
    )]
    async fn carbon_intensity(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let name = self.name();
        let candidates = self.intensity_candidates(query)?;
        let points = first_success(name, candidates, DEFAULT_MAX_ATTEMPTS, |call| async move {
            match call {
                IntensityCall::History(req) => parse_history(name, &self.get(req).await?),
                IntensityCall::Latest(req) => {
                    parse_latest(name, &self.get(req).await?).map(|p| vec![p])
                }
            }
        })
        .await?;
        Ok(ProviderResult::real(name, query.signature(name), points))
    }

    async fn power_breakdown(&self, query: &FetchQuery) -> Result<PowerBreakdown, FetchError> {
        let zone = self.zone_for(query);
        let request = self.endpoint("power-breakdown/latest", &[("zone", zone.as_str())])?;
        let body = self.get(request).await?;
        parse_breakdown(self.name(), &zone, &body)
    }
}
