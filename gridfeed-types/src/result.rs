use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::metric::{Metric, MetricSet};
use crate::series::TimeSeriesPoint;
use crate::signature::QuerySignature;

/// Whether data came from a live provider or the fallback synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Returned by a live provider.
    Real,
    /// Produced by the fallback synthesizer.
    Synthetic,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Real => "real",
            Self::Synthetic => "synthetic",
        })
    }
}

/// Output of one connector call or one synthesis.
///
/// Never mutated after construction; each refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Connector name (or the synthesizer's name).
    pub provider: String,
    /// Key the result was produced for.
    pub signature: QuerySignature,
    /// Points ordered by metric, then strictly increasing timestamp.
    pub points: Vec<TimeSeriesPoint>,
    /// Real or synthetic.
    pub provenance: Provenance,
    /// When the result was produced.
    pub fetched_at: DateTime<Utc>,
    /// The failure that caused a synthetic fallback, if any.
    pub error: Option<FetchError>,
}

impl ProviderResult {
    /// A result fetched from a live provider.
    #[must_use]
    pub fn real(
        provider: impl Into<String>,
        signature: QuerySignature,
        points: Vec<TimeSeriesPoint>,
    ) -> Self {
        Self {
            provider: provider.into(),
            signature,
            points,
            provenance: Provenance::Real,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// A result produced by the synthesizer.
    #[must_use]
    pub fn synthetic(
        provider: impl Into<String>,
        signature: QuerySignature,
        points: Vec<TimeSeriesPoint>,
    ) -> Self {
        Self {
            provider: provider.into(),
            signature,
            points,
            provenance: Provenance::Synthetic,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Attach the failure that led to this result.
    #[must_use]
    pub fn with_error(mut self, err: FetchError) -> Self {
        self.error = Some(err);
        self
    }

    /// Whether this result came from a live provider.
    #[must_use]
    pub fn is_real(&self) -> bool {
        self.provenance == Provenance::Real
    }

    /// Points for one metric, in order.
    pub fn series(&self, metric: Metric) -> impl Iterator<Item = &TimeSeriesPoint> {
        self.points.iter().filter(move |p| p.metric == metric)
    }

    /// Metrics that have at least one point.
    #[must_use]
    pub fn metrics(&self) -> MetricSet {
        self.points.iter().map(|p| p.metric).collect()
    }
}
