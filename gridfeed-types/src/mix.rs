use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::Provenance;

/// Production source categories reported by the carbon feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    /// Biomass and biogas.
    Biomass,
    /// Hard coal and lignite.
    Coal,
    /// Natural gas.
    Gas,
    /// Geothermal.
    Geothermal,
    /// Conventional hydro.
    Hydro,
    /// Pumped-storage discharge.
    HydroStorage,
    /// Battery discharge.
    BatteryStorage,
    /// Nuclear.
    Nuclear,
    /// Oil.
    Oil,
    /// Solar.
    Solar,
    /// Wind.
    Wind,
    /// Unclassified.
    Unknown,
}

impl EnergySource {
    /// Map a carbon-feed breakdown key to a source. Unknown keys map to `Unknown`.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "biomass" => Self::Biomass,
            "coal" => Self::Coal,
            "gas" => Self::Gas,
            "geothermal" => Self::Geothermal,
            "hydro" => Self::Hydro,
            "hydro discharge" | "hydro_discharge" | "hydro storage" => Self::HydroStorage,
            "battery discharge" | "battery_discharge" | "battery storage" => Self::BatteryStorage,
            "nuclear" => Self::Nuclear,
            "oil" => Self::Oil,
            "solar" => Self::Solar,
            "wind" => Self::Wind,
            _ => Self::Unknown,
        }
    }

    /// Renewable generation (storage discharge is excluded).
    #[must_use]
    pub const fn is_renewable(self) -> bool {
        matches!(
            self,
            Self::Biomass | Self::Geothermal | Self::Hydro | Self::Solar | Self::Wind
        )
    }

    /// Fossil-fuelled generation.
    #[must_use]
    pub const fn is_fossil(self) -> bool {
        matches!(self, Self::Coal | Self::Gas | Self::Oil)
    }
}

/// Production per source for one zone and instant, in MW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerBreakdown {
    /// Zone the breakdown applies to.
    pub zone: String,
    /// Instant of the reading.
    pub datetime: DateTime<Utc>,
    /// Non-negative production per source.
    pub production_mw: BTreeMap<EnergySource, f64>,
}

impl PowerBreakdown {
    /// Build from raw per-source values; negative and non-finite values count as zero.
    #[must_use]
    pub fn new(
        zone: impl Into<String>,
        datetime: DateTime<Utc>,
        raw: impl IntoIterator<Item = (EnergySource, f64)>,
    ) -> Self {
        let mut production_mw = BTreeMap::new();
        for (source, mw) in raw {
            let mw = if mw.is_finite() { mw.max(0.0) } else { 0.0 };
            *production_mw.entry(source).or_insert(0.0) += mw;
        }
        Self {
            zone: zone.into(),
            datetime,
            production_mw,
        }
    }

    /// Total production across all sources.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.production_mw.values().sum()
    }

    fn share(&self, part: f64) -> f64 {
        let total = self.total();
        if total > 0.0 { part / total * 100.0 } else { 0.0 }
    }

    /// `sum(renewable) / total` as a percentage; 0 for an empty breakdown.
    #[must_use]
    pub fn renewable_percentage(&self) -> f64 {
        let renewable = self
            .production_mw
            .iter()
            .filter(|(s, _)| s.is_renewable())
            .map(|(_, v)| v)
            .sum();
        self.share(renewable)
    }

    /// `(total - fossil) / total` as a percentage; 0 for an empty breakdown.
    #[must_use]
    pub fn fossil_free_percentage(&self) -> f64 {
        let fossil: f64 = self
            .production_mw
            .iter()
            .filter(|(s, _)| s.is_fossil())
            .map(|(_, v)| v)
            .sum();
        self.share(self.total() - fossil)
    }
}

/// Summary of the grid mix attached to a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMix {
    /// The underlying breakdown.
    pub breakdown: PowerBreakdown,
    /// Renewable share in percent.
    pub renewable_percentage: f64,
    /// Fossil-free share in percent.
    pub fossil_free_percentage: f64,
    /// Real or synthetic.
    pub provenance: Provenance,
}

impl GridMix {
    /// Derive the summary figures from a breakdown.
    #[must_use]
    pub fn new(breakdown: PowerBreakdown, provenance: Provenance) -> Self {
        Self {
            renewable_percentage: breakdown.renewable_percentage(),
            fossil_free_percentage: breakdown.fossil_free_percentage(),
            breakdown,
            provenance,
        }
    }
}
