//! Canonical schema, error taxonomy, and configuration primitives for gridfeed.
#![warn(missing_docs)]

mod bundle;
mod capability;
mod config;
mod connector;
mod error;
mod metric;
mod mix;
mod result;
mod series;
mod signature;
mod site;
mod window;

pub use bundle::{Bundle, ProviderOutcome, Resolution};
pub use capability::Capability;
pub use config::{
    CacheConfig, GridfeedConfig, ProviderSettings, QuotaConfig, QuotaState, QuotaWindow,
};
pub use connector::ConnectorKey;
pub use error::{FetchError, FetchErrorKind, GridfeedError};
pub use metric::{Metric, MetricSet, UnknownMetric};
pub use mix::{EnergySource, GridMix, PowerBreakdown};
pub use result::{Provenance, ProviderResult};
pub use series::{SeriesPoint, TimeSeriesPoint};
pub use signature::QuerySignature;
pub use site::{Coordinate, Site, SiteStatus, Technology};
pub use window::{FetchQuery, MAX_WINDOW_HOURS, TimeWindow};
