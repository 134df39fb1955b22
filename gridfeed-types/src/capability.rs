use core::fmt;
use serde::{Deserialize, Serialize};

use crate::metric::{Metric, MetricSet};

/// High-level capability labels for routing, errors, caching, and telemetry.
///
/// Each capability corresponds to one connector role and owns a fixed slice
/// of the canonical metric space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Day-ahead prices, generation per production type, and total load.
    Market,
    /// Grid carbon intensity and power breakdown.
    Carbon,
    /// Current and forecast weather.
    Weather,
    /// Site metadata.
    Sites,
}

impl Capability {
    /// Every capability, in fan-out order.
    pub const ALL: [Self; 4] = [Self::Market, Self::Carbon, Self::Weather, Self::Sites];

    /// Stable, kebab-case identifier for logs/errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Carbon => "carbon",
            Self::Weather => "weather",
            Self::Sites => "sites",
        }
    }

    /// Metrics served by this capability.
    #[must_use]
    pub const fn metrics(self) -> MetricSet {
        match self {
            Self::Market => MetricSet::PRICE
                .union(MetricSet::GENERATION_MW)
                .union(MetricSet::LOAD_MW),
            Self::Carbon => MetricSet::CARBON_INTENSITY,
            Self::Weather => MetricSet::TEMPERATURE
                .union(MetricSet::WIND_SPEED)
                .union(MetricSet::SOLAR_RADIATION)
                .union(MetricSet::CLOUD_COVER)
                .union(MetricSet::HUMIDITY),
            Self::Sites => MetricSet::empty(),
        }
    }

    /// The capability that serves `metric`.
    #[must_use]
    pub const fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::Price | Metric::GenerationMw | Metric::LoadMw => Self::Market,
            Metric::CarbonIntensity => Self::Carbon,
            Metric::Temperature
            | Metric::WindSpeed
            | Metric::SolarRadiation
            | Metric::CloudCover
            | Metric::Humidity => Self::Weather,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
