//! gridfeed-core
//!
//! Connector traits, time-series helpers, and the fallback synthesizer shared
//! across the gridfeed workspace.
//!
//! - `connector`: the `GridConnector` trait and its role traits.
//! - `timeseries`: normalization and hourly resampling of canonical points.
//! - `synth`: deterministic synthetic series used when a provider fails.
//! - `carbon`: intensity banding and footprint helpers.
//! - `observer`: hooks the aggregator reports fetch outcomes through.
#![warn(missing_docs)]

/// Carbon-intensity classification and footprint.
pub mod carbon;
/// Connector role traits and the primary `GridConnector` interface.
pub mod connector;
/// Middleware trait implemented by connector wrappers.
pub mod middleware;
pub mod observer;
pub mod synth;
/// Time-series utilities for normalization and resampling.
pub mod timeseries;

pub use carbon::{CarbonLevel, carbon_footprint_kg};
pub use connector::{
    CarbonProvider, GridConnector, MarketProvider, SiteProvider, WeatherProvider,
};
pub use middleware::Middleware;
#[cfg(feature = "tracing")]
pub use observer::TracingObserver;
pub use observer::{AggregationObserver, NoopObserver};
pub use synth::{SYNTH_PROVIDER, synthesize, synthesize_metric, synthetic_breakdown};
pub use timeseries::normalize::{is_strictly_increasing, normalize, restrict};
pub use timeseries::resample::resample_to_hourly;
pub use gridfeed_types::*;
