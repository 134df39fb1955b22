use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// The fixed set of canonical metrics every connector output must conform to.
///
/// Provider fields that do not map onto one of these are dropped at the
/// connector boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Air temperature.
    Temperature,
    /// Wind speed at reference height.
    WindSpeed,
    /// Global horizontal irradiance.
    SolarRadiation,
    /// Cloud cover fraction.
    CloudCover,
    /// Relative humidity.
    Humidity,
    /// Day-ahead electricity price.
    Price,
    /// Grid carbon intensity.
    CarbonIntensity,
    /// Generated power.
    GenerationMw,
    /// Grid load.
    LoadMw,
}

impl Metric {
    /// All metrics in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Temperature,
        Self::WindSpeed,
        Self::SolarRadiation,
        Self::CloudCover,
        Self::Humidity,
        Self::Price,
        Self::CarbonIntensity,
        Self::GenerationMw,
        Self::LoadMw,
    ];

    /// Stable snake_case identifier used in logs and serialized output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::WindSpeed => "wind_speed",
            Self::SolarRadiation => "solar_radiation",
            Self::CloudCover => "cloud_cover",
            Self::Humidity => "humidity",
            Self::Price => "price",
            Self::CarbonIntensity => "carbon_intensity",
            Self::GenerationMw => "generation_mw",
            Self::LoadMw => "load_mw",
        }
    }

    /// Canonical unit for values of this metric.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::WindSpeed => "m/s",
            Self::SolarRadiation => "W/m²",
            Self::CloudCover | Self::Humidity => "%",
            Self::Price => "EUR/MWh",
            Self::CarbonIntensity => "gCO2eq/kWh",
            Self::GenerationMw | Self::LoadMw => "MW",
        }
    }

    /// The single-bit [`MetricSet`] for this metric.
    #[must_use]
    pub const fn flag(self) -> MetricSet {
        match self {
            Self::Temperature => MetricSet::TEMPERATURE,
            Self::WindSpeed => MetricSet::WIND_SPEED,
            Self::SolarRadiation => MetricSet::SOLAR_RADIATION,
            Self::CloudCover => MetricSet::CLOUD_COVER,
            Self::Humidity => MetricSet::HUMIDITY,
            Self::Price => MetricSet::PRICE,
            Self::CarbonIntensity => MetricSet::CARBON_INTENSITY,
            Self::GenerationMw => MetricSet::GENERATION_MW,
            Self::LoadMw => MetricSet::LOAD_MW,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown metric name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == needle)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

bitflags! {
    /// A selection of metrics, used in queries and cache keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct MetricSet: u16 {
        /// See [`Metric::Temperature`].
        const TEMPERATURE = 1 << 0;
        /// See [`Metric::WindSpeed`].
        const WIND_SPEED = 1 << 1;
        /// See [`Metric::SolarRadiation`].
        const SOLAR_RADIATION = 1 << 2;
        /// See [`Metric::CloudCover`].
        const CLOUD_COVER = 1 << 3;
        /// See [`Metric::Humidity`].
        const HUMIDITY = 1 << 4;
        /// See [`Metric::Price`].
        const PRICE = 1 << 5;
        /// See [`Metric::CarbonIntensity`].
        const CARBON_INTENSITY = 1 << 6;
        /// See [`Metric::GenerationMw`].
        const GENERATION_MW = 1 << 7;
        /// See [`Metric::LoadMw`].
        const LOAD_MW = 1 << 8;
    }
}

impl MetricSet {
    /// Iterate the contained metrics in declaration order.
    pub fn metrics(self) -> impl Iterator<Item = Metric> {
        Metric::ALL
            .into_iter()
            .filter(move |m| self.contains(m.flag()))
    }

    /// Whether `metric` is part of this set.
    #[must_use]
    pub const fn has(self, metric: Metric) -> bool {
        self.contains(metric.flag())
    }
}

impl From<Metric> for MetricSet {
    fn from(m: Metric) -> Self {
        m.flag()
    }
}

impl FromIterator<Metric> for MetricSet {
    fn from_iter<I: IntoIterator<Item = Metric>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |acc, m| acc | m.flag())
    }
}
