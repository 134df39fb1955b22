use core::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::MetricSet;
use crate::site::{Coordinate, Technology};
use crate::window::TimeWindow;

/// Deterministic cache key: provider, rounded location, hour-bucketed window,
/// requested metrics, and the site technology when one was passed along.
///
/// The technology is part of the key because connectors may filter on it
/// (generation per production type), so a site query and a bare-coordinate
/// query at the same spot are different requests.
///
/// Concurrent requests for co-located points within the same hour buckets
/// collapse onto the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySignature {
    provider: String,
    lat_key: i64,
    lon_key: i64,
    precision: u8,
    start_hour: i64,
    end_hour: i64,
    metrics: MetricSet,
    technology: Option<Technology>,
}

impl QuerySignature {
    /// Derive the signature for a query.
    #[must_use]
    pub fn new(
        provider: &str,
        coordinate: &Coordinate,
        window: &TimeWindow,
        metrics: MetricSet,
        precision: u8,
    ) -> Self {
        let (lat_key, lon_key) = coordinate.rounded_key(precision);
        let (start_hour, end_hour) = window.hour_buckets();
        Self {
            provider: provider.to_string(),
            lat_key,
            lon_key,
            precision,
            start_hour,
            end_hour,
            metrics,
            technology: None,
        }
    }

    /// Key on the site technology as well.
    #[must_use]
    pub fn with_technology(mut self, technology: Option<Technology>) -> Self {
        self.technology = technology;
        self
    }

    /// Provider the signature was derived for.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Metrics covered by the signature.
    #[must_use]
    pub const fn metrics(&self) -> MetricSet {
        self.metrics
    }

    /// A stable 64-bit seed derived from every component of the key.
    ///
    /// FNV-1a over a fixed byte layout, so the value does not depend on the
    /// process or the standard library's hasher.
    #[must_use]
    pub fn seed(&self) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        let mut hash = OFFSET;
        let mut feed = |bytes: &[u8]| {
            for b in bytes {
                hash ^= u64::from(*b);
                hash = hash.wrapping_mul(PRIME);
            }
        };
        feed(self.provider.as_bytes());
        feed(&self.lat_key.to_le_bytes());
        feed(&self.lon_key.to_le_bytes());
        feed(&[self.precision]);
        feed(&self.start_hour.to_le_bytes());
        feed(&self.end_hour.to_le_bytes());
        feed(&self.metrics.bits().to_le_bytes());
        if let Some(tech) = self.technology {
            feed(tech.as_str().as_bytes());
        }
        hash
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}[{}..{}]#{:x}",
            self.provider,
            self.lat_key,
            self.lon_key,
            self.precision,
            self.start_hour,
            self.end_hour,
            self.metrics.bits()
        )?;
        match self.technology {
            Some(tech) => write!(f, "~{tech}"),
            None => Ok(()),
        }
    }
}
