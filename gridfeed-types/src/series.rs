use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// One canonical observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Observation instant.
    pub timestamp: DateTime<Utc>,
    /// Which metric this is.
    pub metric: Metric,
    /// Observed value, expressed in `unit`.
    pub value: f64,
    /// Unit string; always the metric's canonical unit.
    pub unit: String,
}

impl TimeSeriesPoint {
    /// Build a point carrying the metric's canonical unit.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, metric: Metric, value: f64) -> Self {
        Self {
            timestamp,
            metric,
            value,
            unit: metric.unit().to_string(),
        }
    }
}

/// A point in the caller-facing bundle; the metric is implied by its series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Observation instant.
    pub timestamp: DateTime<Utc>,
    /// Observed value.
    pub value: f64,
    /// Unit string.
    pub unit: String,
}

impl From<&TimeSeriesPoint> for SeriesPoint {
    fn from(p: &TimeSeriesPoint) -> Self {
        Self {
            timestamp: p.timestamp,
            value: p.value,
            unit: p.unit.clone(),
        }
    }
}
