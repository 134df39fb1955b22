//! Carbon-intensity helpers shared by adapters and callers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative band for a carbon intensity in gCO2eq/kWh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonLevel {
    /// Below 100.
    VeryLow,
    /// 100 to 199.
    Low,
    /// 200 to 399.
    Medium,
    /// 400 to 599.
    High,
    /// 600 and above.
    VeryHigh,
}

impl CarbonLevel {
    /// Classify an intensity value.
    #[must_use]
    pub fn classify(intensity: f64) -> Self {
        match intensity {
            i if i < 100.0 => Self::VeryLow,
            i if i < 200.0 => Self::Low,
            i if i < 400.0 => Self::Medium,
            i if i < 600.0 => Self::High,
            _ => Self::VeryHigh,
        }
    }

    /// Stable snake_case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for CarbonLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emissions in kg CO2eq for `kwh` consumed at `intensity` gCO2eq/kWh.
#[must_use]
pub fn carbon_footprint_kg(kwh: f64, intensity: f64) -> f64 {
    kwh * intensity / 1000.0
}
