//! OpenWeather connector.
//!
//! Tries One Call 3.0 (`current` + `hourly` + `daily`) first and falls back to
//! the 2.5 forecast and current-weather endpoints, which free-tier keys can
//! still reach.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gridfeed_core::connector::{ConnectorKey, GridConnector, WeatherProvider};
use gridfeed_core::{
    Capability, FetchError, FetchQuery, Metric, MetricSet, ProviderResult, TimeSeriesPoint,
    normalize, resample_to_hourly,
};
use serde::Deserialize;
use url::Url;

use crate::candidates::{DEFAULT_MAX_ATTEMPTS, first_success};
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::wire::from_unix;

/// Clear-sky global irradiance per UV-index unit, in W/m².
const IRRADIANCE_PER_UVI: f64 = 100.0;

/// One observation or forecast step.
///
/// Optional sub-fields the payload did not carry stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    /// Observation or forecast instant.
    pub at: DateTime<Utc>,
    /// Air temperature, °C.
    pub temperature: Option<f64>,
    /// Relative humidity, %.
    pub humidity: Option<f64>,
    /// Cloud cover, %.
    pub cloud_cover: Option<f64>,
    /// Mean wind speed, m/s.
    pub wind_speed: Option<f64>,
    /// Wind direction, degrees.
    pub wind_direction: Option<f64>,
    /// Gust speed, m/s.
    pub wind_gust: Option<f64>,
    /// UV index.
    pub uv_index: Option<f64>,
}

impl WeatherSample {
    /// Global horizontal irradiance estimated from UV index and cloud cover.
    ///
    /// `None` unless the sample carries both; the estimate applies the
    /// Kasten-Czeplak cloud attenuation to a UV-scaled clear-sky value.
    #[must_use]
    pub fn solar_radiation(&self) -> Option<f64> {
        let uvi = self.uv_index?.max(0.0);
        let cloud = (self.cloud_cover? / 100.0).clamp(0.0, 1.0);
        Some(uvi * IRRADIANCE_PER_UVI * (1.0 - 0.75 * cloud.powf(3.4)))
    }

    fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::CloudCover => self.cloud_cover,
            Metric::WindSpeed => self.wind_speed,
            Metric::SolarRadiation => self.solar_radiation(),
            _ => None,
        }
    }
}

/// Per-day summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyWeather {
    /// Forecast instant for the day (typically local noon).
    pub at: DateTime<Utc>,
    /// Sunrise, absent in polar day or night.
    pub sunrise: Option<DateTime<Utc>>,
    /// Sunset, absent in polar day or night.
    pub sunset: Option<DateTime<Utc>>,
    /// Minimum temperature, °C.
    pub temp_min: Option<f64>,
    /// Maximum temperature, °C.
    pub temp_max: Option<f64>,
    /// Gust speed, m/s.
    pub wind_gust: Option<f64>,
    /// UV index.
    pub uv_index: Option<f64>,
}

impl DailyWeather {
    /// Time between sunrise and sunset.
    #[must_use]
    pub fn daylight(&self) -> Option<Duration> {
        Some(self.sunset? - self.sunrise?)
    }

    /// Whether `at` falls between sunrise and sunset.
    #[must_use]
    pub fn is_daylight(&self, at: DateTime<Utc>) -> Option<bool> {
        Some(at >= self.sunrise? && at < self.sunset?)
    }
}

/// Decoded weather payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherReport {
    /// Current conditions.
    pub current: Option<WeatherSample>,
    /// Forecast steps, ascending.
    pub hourly: Vec<WeatherSample>,
    /// Daily summaries, ascending.
    pub daily: Vec<DailyWeather>,
}

impl WeatherReport {
    /// Canonical hourly points for `metrics`.
    ///
    /// Current conditions fold into the hour bucket they fall in.
    #[must_use]
    pub fn points(&self, metrics: MetricSet) -> Vec<TimeSeriesPoint> {
        let raw: Vec<TimeSeriesPoint> = self
            .current
            .iter()
            .chain(self.hourly.iter())
            .flat_map(|s| {
                metrics
                    .metrics()
                    .filter_map(move |m| s.value(m).map(|v| TimeSeriesPoint::new(s.at, m, v)))
            })
            .collect();
        normalize(resample_to_hourly(&raw))
    }
}

// ---- One Call 3.0 ----

#[derive(Debug, Deserialize)]
struct OneCallSample {
    dt: i64,
    temp: Option<f64>,
    humidity: Option<f64>,
    clouds: Option<f64>,
    wind_speed: Option<f64>,
    wind_deg: Option<f64>,
    wind_gust: Option<f64>,
    uvi: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DailyTemp {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OneCallDaily {
    dt: i64,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    temp: Option<DailyTemp>,
    wind_gust: Option<f64>,
    uvi: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OneCall {
    current: Option<OneCallSample>,
    #[serde(default)]
    hourly: Vec<OneCallSample>,
    #[serde(default)]
    daily: Vec<OneCallDaily>,
}

fn instant(provider: &str, secs: i64) -> Result<DateTime<Utc>, FetchError> {
    from_unix(secs).ok_or_else(|| FetchError::protocol(provider, format!("bad timestamp: {secs}")))
}

impl OneCallSample {
    fn into_sample(self, provider: &str) -> Result<WeatherSample, FetchError> {
        Ok(WeatherSample {
            at: instant(provider, self.dt)?,
            temperature: self.temp,
            humidity: self.humidity,
            cloud_cover: self.clouds,
            wind_speed: self.wind_speed,
            wind_direction: self.wind_deg,
            wind_gust: self.wind_gust,
            uv_index: self.uvi,
        })
    }
}

fn decode<'de, T: Deserialize<'de>>(provider: &str, body: &'de str) -> Result<T, FetchError> {
    serde_json::from_str(body)
        .map_err(|e| FetchError::protocol(provider, format!("invalid JSON: {e}")))
}

/// Parse a One Call 3.0 payload.
///
/// # Errors
/// `Protocol` for malformed JSON, bad timestamps, or a payload with neither
/// `current` nor `hourly`.
pub fn parse_one_call(provider: &str, body: &str) -> Result<WeatherReport, FetchError> {
    let raw: OneCall = decode(provider, body)?;
    if raw.current.is_none() && raw.hourly.is_empty() {
        return Err(FetchError::protocol(
            provider,
            "payload has neither current nor hourly data",
        ));
    }
    let current = raw
        .current
        .map(|s| s.into_sample(provider))
        .transpose()?;
    let hourly = raw
        .hourly
        .into_iter()
        .map(|s| s.into_sample(provider))
        .collect::<Result<Vec<_>, _>>()?;
    let daily = raw
        .daily
        .into_iter()
        .map(|d| {
            Ok(DailyWeather {
                at: instant(provider, d.dt)?,
                sunrise: d.sunrise.and_then(from_unix),
                sunset: d.sunset.and_then(from_unix),
                temp_min: d.temp.as_ref().and_then(|t| t.min),
                temp_max: d.temp.as_ref().and_then(|t| t.max),
                wind_gust: d.wind_gust,
                uv_index: d.uvi,
            })
        })
        .collect::<Result<Vec<_>, FetchError>>()?;
    Ok(WeatherReport {
        current,
        hourly,
        daily,
    })
}

// ---- 2.5 forecast / current weather ----

#[derive(Debug, Deserialize)]
struct Main {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
    deg: Option<f64>,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Clouds {
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Sys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LegacyItem {
    dt: i64,
    main: Main,
    wind: Option<Wind>,
    clouds: Option<Clouds>,
    sys: Option<Sys>,
}

#[derive(Debug, Deserialize)]
struct LegacyForecast {
    list: Vec<LegacyItem>,
}

impl LegacyItem {
    fn to_sample(&self, provider: &str) -> Result<WeatherSample, FetchError> {
        Ok(WeatherSample {
            at: instant(provider, self.dt)?,
            temperature: self.main.temp,
            humidity: self.main.humidity,
            cloud_cover: self.clouds.as_ref().and_then(|c| c.all),
            wind_speed: self.wind.as_ref().and_then(|w| w.speed),
            wind_direction: self.wind.as_ref().and_then(|w| w.deg),
            wind_gust: self.wind.as_ref().and_then(|w| w.gust),
            uv_index: None,
        })
    }
}

/// Parse a 2.5 `/forecast` payload (3-hourly steps).
///
/// # Errors
/// `Protocol` for malformed JSON or bad timestamps.
pub fn parse_forecast(provider: &str, body: &str) -> Result<WeatherReport, FetchError> {
    let raw: LegacyForecast = decode(provider, body)?;
    let hourly = raw
        .list
        .iter()
        .map(|item| item.to_sample(provider))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WeatherReport {
        hourly,
        ..WeatherReport::default()
    })
}

/// Parse a 2.5 `/weather` payload (current conditions only).
///
/// # Errors
/// `Protocol` for malformed JSON or bad timestamps.
pub fn parse_current(provider: &str, body: &str) -> Result<WeatherReport, FetchError> {
    let raw: LegacyItem = decode(provider, body)?;
    let current = raw.to_sample(provider)?;
    let daily = raw
        .sys
        .as_ref()
        .map(|sys| DailyWeather {
            at: current.at,
            sunrise: sys.sunrise.and_then(from_unix),
            sunset: sys.sunset.and_then(from_unix),
            temp_min: None,
            temp_max: None,
            wind_gust: current.wind_gust,
            uv_index: None,
        })
        .into_iter()
        .collect();
    Ok(WeatherReport {
        current: Some(current),
        hourly: Vec::new(),
        daily,
    })
}

#[derive(Clone, Copy)]
enum Endpoint {
    OneCall,
    Forecast,
    Current,
}

impl Endpoint {
    const ORDER: [Self; 3] = [Self::OneCall, Self::Forecast, Self::Current];

    const fn path(self) -> &'static str {
        match self {
            Self::OneCall => "3.0/onecall",
            Self::Forecast => "2.5/forecast",
            Self::Current => "2.5/weather",
        }
    }

    fn parse(self, provider: &str, body: &str) -> Result<WeatherReport, FetchError> {
        match self {
            Self::OneCall => parse_one_call(provider, body),
            Self::Forecast => parse_forecast(provider, body),
            Self::Current => parse_current(provider, body),
        }
    }
}

/// Connector for the OpenWeather API.
pub struct OpenWeatherConnector {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    base: Url,
}

impl OpenWeatherConnector {
    /// Static connector key.
    pub const KEY: ConnectorKey = ConnectorKey::new("gridfeed-openweather");

    /// Public API root; versioned paths are appended to it.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openweathermap.org/data";

    /// Connector against the public endpoint using the production transport.
    ///
    /// # Errors
    /// Returns `Protocol` if the built-in endpoint cannot be parsed.
    pub fn new(api_key: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_transport(
            api_key,
            Self::DEFAULT_BASE_URL,
            Arc::new(ReqwestTransport::default()),
        )
    }

    /// Connector with an explicit API root and transport.
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

    fn request(&self, endpoint: Endpoint, query: &FetchQuery) -> Result<HttpRequest, FetchError> {
        let mut url = self.base.join(endpoint.path()).map_err(|e| {
            FetchError::protocol(self.name(), format!("bad endpoint {}: {e}", endpoint.path()))
        })?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("lat", &query.coordinate.latitude.to_string())
                .append_pair("lon", &query.coordinate.longitude.to_string())
                .append_pair("appid", &self.api_key)
                .append_pair("units", "metric");
            if matches!(endpoint, Endpoint::OneCall) {
                q.append_pair("exclude", "minutely,alerts");
            }
        }
        Ok(HttpRequest::get(url))
    }

    /// Fetch the richest report the key can reach.
    ///
    /// # Errors
    /// The last endpoint's failure when every candidate fails.
    pub async fn report(&self, query: &FetchQuery) -> Result<WeatherReport, FetchError> {
        let name = self.name();
        let requests = Endpoint::ORDER
            .into_iter()
            .map(|e| Ok((e, self.request(e, query)?)))
            .collect::<Result<Vec<_>, FetchError>>()?;
        first_success(name, requests, DEFAULT_MAX_ATTEMPTS, |(endpoint, req)| async move {
            let body = self.transport.get(name, req).await?.into_body(name)?;
            endpoint.parse(name, &body)
        })
        .await
    }
}

impl GridConnector for OpenWeatherConnector {
    fn name(&self) -> &'static str {
        Self::KEY.as_str()
    }

    fn vendor(&self) -> &'static str {
        "OpenWeather"
    }

    fn as_weather_provider(&self) -> Option<&dyn WeatherProvider> {
        Some(self as &dyn WeatherProvider)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherConnector {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "gridfeed_providers::openweather::weather",
            skip(self, query),
            fields(coordinate = %query.coordinate),
        )
    )]
    async fn weather(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let report = self.report(query).await?;
        let metrics = query.metrics & Capability::Weather.metrics();
        Ok(ProviderResult::real(
            self.name(),
            query.signature(self.name()),
            report.points(metrics),
        ))
    }
}
