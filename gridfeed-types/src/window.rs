use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GridfeedError;
use crate::metric::MetricSet;
use crate::signature::QuerySignature;
use crate::site::{Coordinate, Technology};

const SECS_PER_HOUR: i64 = 3600;

/// Upper bound on the number of hours a single query may span.
pub const MAX_WINDOW_HOURS: i64 = 24 * 31;

/// Half-open time window `[start, end)` in UTC.
///
/// Deserialization goes through [`TimeWindow::new`], so decoded windows are
/// validated the same way as constructed ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = GridfeedError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    /// Build a window.
    ///
    /// # Errors
    /// Returns `InvalidArg` if `start >= end` or the window spans more than
    /// [`MAX_WINDOW_HOURS`].
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, GridfeedError> {
        if start >= end {
            return Err(GridfeedError::InvalidArg(format!(
                "window start {start} is not before end {end}"
            )));
        }
        if end - start > Duration::hours(MAX_WINDOW_HOURS) {
            return Err(GridfeedError::InvalidArg(format!(
                "window longer than {MAX_WINDOW_HOURS} hours"
            )));
        }
        Ok(Self { start, end })
    }

    /// The `hours` whole hours preceding the hour that contains `now`, including it.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `hours` is zero or too large.
    pub fn trailing_hours(now: DateTime<Utc>, hours: u32) -> Result<Self, GridfeedError> {
        let end = floor_hour(now) + Duration::hours(1);
        Self::new(end - Duration::hours(i64::from(hours)), end)
    }

    /// Window start (inclusive).
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Window end (exclusive).
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Widen to whole hours: start floored, end ceiled.
    #[must_use]
    pub fn hour_aligned(&self) -> Self {
        let start = floor_hour(self.start);
        let floored_end = floor_hour(self.end);
        let end = if floored_end == self.end {
            floored_end
        } else {
            floored_end + Duration::hours(1)
        };
        Self { start, end }
    }

    /// Whether `ts` lies inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Number of whole hours in the hour-aligned window.
    #[must_use]
    pub fn hour_count(&self) -> usize {
        let w = self.hour_aligned();
        usize::try_from((w.end - w.start).num_hours()).unwrap_or(0)
    }

    /// Hour instants of the hour-aligned window, ascending.
    pub fn hours(&self) -> impl Iterator<Item = DateTime<Utc>> {
        let w = self.hour_aligned();
        (0..self.hour_count()).filter_map(move |i| {
            i64::try_from(i)
                .ok()
                .map(|h| w.start + Duration::hours(h))
        })
    }

    /// Hour buckets `(start, end)` as epoch hours; used in cache keys.
    #[must_use]
    pub fn hour_buckets(&self) -> (i64, i64) {
        let w = self.hour_aligned();
        (
            w.start.timestamp().div_euclid(SECS_PER_HOUR),
            w.end.timestamp().div_euclid(SECS_PER_HOUR),
        )
    }
}

fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp().div_euclid(SECS_PER_HOUR) * SECS_PER_HOUR;
    Utc.timestamp_opt(secs, 0).single().unwrap_or(ts)
}

/// Parameters handed to a connector for one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchQuery {
    /// Location to query.
    pub coordinate: Coordinate,
    /// Hour-aligned time window.
    pub window: TimeWindow,
    /// Metrics requested from this connector.
    pub metrics: MetricSet,
    /// Rated capacity of the target site, when known.
    pub capacity_mw: Option<f64>,
    /// Technology of the target site, when known.
    pub technology: Option<Technology>,
    /// Decimal places kept from the coordinate in cache keys.
    pub precision: u8,
}

impl FetchQuery {
    /// Build a query for a coordinate and window; the window is hour-aligned.
    #[must_use]
    pub fn new(coordinate: Coordinate, window: TimeWindow, metrics: MetricSet) -> Self {
        Self {
            coordinate,
            window: window.hour_aligned(),
            metrics,
            capacity_mw: None,
            technology: None,
            precision: 2,
        }
    }

    /// Attach site capacity and technology.
    #[must_use]
    pub fn with_site(mut self, capacity_mw: Option<f64>, technology: Option<Technology>) -> Self {
        self.capacity_mw = capacity_mw;
        self.technology = technology;
        self
    }

    /// Set the coordinate precision used in cache keys.
    #[must_use]
    pub const fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    /// Restrict to a subset of metrics.
    #[must_use]
    pub fn for_metrics(&self, metrics: MetricSet) -> Self {
        Self {
            metrics,
            ..self.clone()
        }
    }

    /// Cache signature for this query against `provider`.
    #[must_use]
    pub fn signature(&self, provider: &str) -> QuerySignature {
        QuerySignature::new(
            provider,
            &self.coordinate,
            &self.window,
            self.metrics,
            self.precision,
        )
        .with_technology(self.technology)
    }
}
