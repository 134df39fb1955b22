//! Rebase connector: site metadata and site-level weather.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use gridfeed_core::connector::{ConnectorKey, GridConnector, SiteProvider, WeatherProvider};
use gridfeed_core::{
    Capability, Coordinate, FetchError, FetchQuery, Metric, ProviderResult, Site, SiteStatus,
    Technology, TimeSeriesPoint, normalize, resample_to_hourly,
};
use serde::Deserialize;
use url::Url;

use crate::candidates::{DEFAULT_MAX_ATTEMPTS, first_success};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::wire::parse_instant;

#[derive(Debug, Deserialize)]
struct LatLon {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SiteRecord {
    id: serde_json::Value,
    name: Option<String>,
    #[serde(alias = "coordinates")]
    location: Option<LatLon>,
    capacity: Option<f64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SitesPayload {
    Bare(Vec<SiteRecord>),
    Wrapped { sites: Vec<SiteRecord> },
}

impl SiteRecord {
    fn into_site(self, provider: &str) -> Result<Site, FetchError> {
        let bad = |what: String| FetchError::protocol(provider, what);
        let id = match self.id {
            serde_json::Value::String(s) if !s.trim().is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => return Err(bad(format!("site id is not a string or number: {other}"))),
        };
        let loc = self
            .location
            .ok_or_else(|| bad(format!("site {id} has no location")))?;
        let coordinate = Coordinate::new(loc.latitude, loc.longitude)
            .map_err(|e| bad(format!("site {id}: {e}")))?;
        let technology = self
            .kind
            .as_deref()
            .ok_or_else(|| bad(format!("site {id} has no type")))?
            .parse::<Technology>()
            .map_err(|e| bad(format!("site {id}: {e}")))?;
        let status = match self.status.as_deref() {
            Some(s) => s
                .parse::<SiteStatus>()
                .map_err(|e| bad(format!("site {id}: {e}")))?,
            None => SiteStatus::default(),
        };
        let capacity_mw = self.capacity.filter(|c| c.is_finite() && *c >= 0.0).unwrap_or(0.0);
        Ok(Site {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            coordinate,
            capacity_mw,
            technology,
            status,
        })
    }
}

/// Parse the `/sites` payload, either a bare array or `{ "sites": [...] }`.
///
/// # Errors
/// `Protocol` for malformed JSON or any malformed record; one bad record
/// rejects the whole list.
pub fn parse_sites(provider: &str, body: &str) -> Result<Vec<Site>, FetchError> {
    let payload: SitesPayload = serde_json::from_str(body)
        .map_err(|e| FetchError::protocol(provider, format!("invalid sites payload: {e}")))?;
    let records = match payload {
        SitesPayload::Bare(r) | SitesPayload::Wrapped { sites: r } => r,
    };
    records.into_iter().map(|r| r.into_site(provider)).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RebaseSample {
    timestamp: Option<String>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    wind_speed: Option<f64>,
    cloud_cover: Option<f64>,
    #[serde(alias = "ghi")]
    solar_radiation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RebaseWeather {
    current: Option<RebaseSample>,
    #[serde(default)]
    forecast: Vec<RebaseSample>,
}

impl RebaseSample {
    fn points(&self, provider: &str, fallback: chrono::DateTime<Utc>) -> Result<Vec<TimeSeriesPoint>, FetchError> {
        let at = match &self.timestamp {
            Some(raw) => parse_instant(raw)
                .ok_or_else(|| FetchError::protocol(provider, format!("bad timestamp: {raw}")))?,
            None => fallback,
        };
        Ok([
            (Metric::Temperature, self.temperature),
            (Metric::Humidity, self.humidity),
            (Metric::WindSpeed, self.wind_speed),
            (Metric::CloudCover, self.cloud_cover),
            (Metric::SolarRadiation, self.solar_radiation),
        ]
        .into_iter()
        .filter_map(|(m, v)| Some(TimeSeriesPoint::new(at, m, v?)))
        .collect())
    }
}

/// Parse a weather payload: `{current, forecast[]}` or a bare current sample.
///
/// A current sample without a timestamp is stamped with `observed_at`.
///
/// # Errors
/// `Protocol` for malformed JSON, bad timestamps, or a payload with no values.
pub fn parse_weather(
    provider: &str,
    body: &str,
    observed_at: chrono::DateTime<Utc>,
) -> Result<Vec<TimeSeriesPoint>, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| FetchError::protocol(provider, format!("invalid JSON: {e}")))?;
    let nested = value.get("current").is_some() || value.get("forecast").is_some();
    let decoded: RebaseWeather = if nested {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|current| RebaseWeather {
            current: Some(current),
            forecast: Vec::new(),
        })
    }
    .map_err(|e| FetchError::protocol(provider, format!("invalid weather payload: {e}")))?;

    let mut points = Vec::new();
    for sample in decoded.current.iter().chain(decoded.forecast.iter()) {
        points.extend(sample.points(provider, observed_at)?);
    }
    if points.is_empty() {
        return Err(FetchError::protocol(provider, "weather payload carries no values"));
    }
    Ok(normalize(resample_to_hourly(&points)))
}

/// Connector for the Rebase energy platform.
pub struct RebaseConnector {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    base: Url,
}

impl RebaseConnector {
    /// Static connector key.
    pub const KEY: ConnectorKey = ConnectorKey::new("gridfeed-rebase");

    /// Public API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.rebase.energy/v1";

    /// Connector against the public endpoint using the production transport.
    ///
    /// # Errors
    /// Returns `Protocol` if the built-in endpoint cannot be parsed.
    pub fn new_raw(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_transport(
            api_key,
            Self::DEFAULT_BASE_URL,
            Arc::new(ReqwestTransport::default()),
        )
    }

    /// Connector with an explicit endpoint and transport.
    ///
    /// # Errors
    /// Returns `Protocol` if `base_url` is not a valid URL.
    pub fn with_transport(
        api_key: impl Into<String>,
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, FetchError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalized).map_err(|e| {
            FetchError::protocol(Self::KEY.as_str(), format!("bad base url {base_url}: {e}"))
        })?;
        Ok(Self {
            transport,
            api_key: api_key.into(),
            base,
        })
    }

    fn request(&self, path: &str, params: &[(&str, String)]) -> Result<HttpRequest, FetchError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| FetchError::protocol(self.name(), format!("bad endpoint {path}: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(HttpRequest::get(url)
            .with_header("content-type", "application/json")
            .with_bearer(&self.api_key))
    }

    async fn get(&self, request: HttpRequest) -> Result<String, FetchError> {
        let name = self.name();
        self.transport.get(name, request).await?.into_body(name)
    }
}

impl GridConnector for RebaseConnector {
    fn name(&self) -> &'static str {
        Self::KEY.as_str()
    }

    fn vendor(&self) -> &'static str {
        "Rebase"
    }

    fn as_weather_provider(&self) -> Option<&dyn WeatherProvider> {
        Some(self as &dyn WeatherProvider)
    }

    fn as_site_provider(&self) -> Option<&dyn SiteProvider> {
        Some(self as &dyn SiteProvider)
    }
}

#[async_trait]
impl SiteProvider for RebaseConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gridfeed_providers::rebase::sites", skip(self))
    )]
    async fn sites(&self) -> Result<Vec<Site>, FetchError> {
        let body = self.get(self.request("sites", &[])?).await?;
        parse_sites(self.name(), &body)
    }
}

#[async_trait]
impl WeatherProvider for RebaseConnector {
    async fn weather(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let name = self.name();
        let coords = [
            ("lat", query.coordinate.latitude.to_string()),
            ("lon", query.coordinate.longitude.to_string()),
        ];
        let candidates = [
            self.request("weather", &coords)?,
            self.request("weather/current", &coords)?,
        ];
        let observed_at = Utc::now();
        let points = first_success(name, candidates, DEFAULT_MAX_ATTEMPTS, |req| async move {
            parse_weather(name, &self.get(req).await?, observed_at)
        })
        .await?;
        let wanted = query.metrics & Capability::Weather.metrics();
        let points = points.into_iter().filter(|p| wanted.has(p.metric)).collect();
        Ok(ProviderResult::real(name, query.signature(name), points))
    }
}
