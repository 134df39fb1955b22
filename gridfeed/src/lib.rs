//! Gridfeed aggregates energy-market, carbon, weather and site data across
//! independent providers.
//!
//! Overview
//! - Fans one request out to every capability (market, carbon, weather)
//!   concurrently; connectors implement the `gridfeed_core` contracts.
//! - Absorbs every connector failure: errors, timeouts and empty answers are
//!   replaced with deterministic synthetic series, tagged as such.
//! - Caches real results per provider and query signature with a TTL per
//!   capability; synthetic results are never cached.
//!
//! Key behaviors and trade-offs
//! - Isolation: one provider failing or hanging never delays the others beyond
//!   the provider timeout, and never fails the request.
//! - Ordering: connectors serving the same capability are tried in
//!   registration order; the first real answer wins.
//! - Gaps: a real result missing a requested metric has that metric filled in
//!   synthetically; the bundle's provenance map says which metrics are real.
//! - Sites: the site feed is metadata; when it is unavailable the built-in
//!   registry is used instead of synthetic data.
//!
//! Examples
//! Building an orchestrator from the environment:
//! ```rust,ignore
//! let feed = gridfeed::Gridfeed::from_env()?;
//! ```
//!
//! Aggregating a day of data for a registered site:
//! ```rust,ignore
//! use chrono::Utc;
//! use gridfeed::{AggregateRequest, Capability, TimeWindow};
//!
//! let window = TimeWindow::trailing_hours(Utc::now(), 24)?;
//! let metrics = Capability::Market.metrics() | Capability::Carbon.metrics();
//! let bundle = feed
//!     .aggregate(&AggregateRequest::site("site-001", window, metrics))
//!     .await?;
//! for metric in bundle.synthetic_metrics() {
//!     println!("{metric} is synthetic");
//! }
//! ```
#![warn(missing_docs)]

mod aggregate;
pub(crate) mod core;
mod registry;

pub use aggregate::{AggregateRequest, Target};
pub use core::{Gridfeed, GridfeedBuilder};
pub use registry::{SiteRegistry, SiteSource, builtin_sites};

pub use gridfeed_middleware::{
    BlacklistMiddleware, ConnectorBuilder, QuotaAwareConnector, QuotaMiddleware, ResultCache,
};

// Re-export core types for convenience
pub use gridfeed_core::{
    AggregationObserver, Bundle, CacheConfig, Capability, CarbonLevel, Coordinate, EnergySource,
    FetchError, FetchErrorKind, FetchQuery, GridConnector, GridMix, GridfeedConfig, GridfeedError,
    Metric, MetricSet, NoopObserver, PowerBreakdown, Provenance, ProviderOutcome,
    ProviderResult, ProviderSettings, QuerySignature, QuotaConfig, QuotaState, QuotaWindow,
    Resolution, SeriesPoint, Site, SiteStatus, Technology, TimeSeriesPoint, TimeWindow,
    carbon_footprint_kg,
};
