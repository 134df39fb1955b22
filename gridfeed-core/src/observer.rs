//! Event hooks the aggregator reports through.
//!
//! Failures never reach the caller as errors, so this is where degraded data
//! becomes visible. Implementations must be cheap and must not block.

use std::time::Duration;

use gridfeed_types::{Capability, FetchError, QuerySignature};

/// Receives one event per resolved capability of an aggregation.
pub trait AggregationObserver: Send + Sync {
    /// A cached real result was served.
    fn on_cache_hit(&self, _capability: Capability, _signature: &QuerySignature) {}

    /// A connector returned real data.
    fn on_fetch_succeeded(
        &self,
        _capability: Capability,
        _connector: &str,
        _latency: Duration,
        _points: usize,
    ) {
    }

    /// A connector failed or timed out.
    fn on_fetch_failed(&self, _capability: Capability, _connector: &str, _error: &FetchError) {}

    /// Synthetic data was produced for `capability`.
    fn on_synthesized(&self, _capability: Capability, _points: usize) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AggregationObserver for NoopObserver {}

/// Emits each event as a structured `tracing` event.
#[cfg(feature = "tracing")]
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl AggregationObserver for TracingObserver {
    fn on_cache_hit(&self, capability: Capability, signature: &QuerySignature) {
        tracing::debug!(capability = %capability, signature = %signature, "cache hit");
    }

    fn on_fetch_succeeded(
        &self,
        capability: Capability,
        connector: &str,
        latency: Duration,
        points: usize,
    ) {
        tracing::info!(
            capability = %capability,
            connector,
            latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            points,
            "fetch succeeded"
        );
    }

    fn on_fetch_failed(&self, capability: Capability, connector: &str, error: &FetchError) {
        tracing::warn!(
            capability = %capability,
            connector,
            kind = ?error.kind(),
            error = %error,
            "fetch failed"
        );
    }

    fn on_synthesized(&self, capability: Capability, points: usize) {
        tracing::info!(capability = %capability, points, "serving synthetic data");
    }
}
