use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::metric::Metric;
use crate::mix::GridMix;
use crate::result::Provenance;
use crate::series::SeriesPoint;
use crate::site::Site;

/// How a capability's result was obtained for one aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Served from the result cache.
    Cached,
    /// Fetched from the live provider.
    Live,
    /// Produced by the synthesizer.
    Synthetic,
}

/// Per-capability outcome of one aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOutcome {
    /// Connector that served (or failed to serve) the capability, if one was registered.
    pub provider: Option<String>,
    /// How the result was obtained.
    pub resolution: Resolution,
    /// Message of the failure that caused synthesis.
    pub error: Option<String>,
}

/// The merged canonical output for one site and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    /// Site the data applies to.
    pub site: Site,
    /// Requested metrics, each a full-length ascending series.
    pub series: BTreeMap<Metric, Vec<SeriesPoint>>,
    /// Provenance per metric.
    pub provenance: BTreeMap<Metric, Provenance>,
    /// When the bundle was assembled.
    #[serde(rename = "fetchedAt")]
    pub fetched_at: DateTime<Utc>,
    /// Grid mix summary, present when carbon intensity was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_mix: Option<GridMix>,
    /// Per-capability outcomes, for partial-success reporting.
    pub outcomes: BTreeMap<Capability, ProviderOutcome>,
}

impl Bundle {
    /// Whether every requested metric is backed by real data.
    #[must_use]
    pub fn is_fully_real(&self) -> bool {
        self.provenance.values().all(|p| *p == Provenance::Real)
    }

    /// Metrics that were synthesized.
    pub fn synthetic_metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.provenance
            .iter()
            .filter(|(_, p)| **p == Provenance::Synthetic)
            .map(|(m, _)| *m)
    }
}
