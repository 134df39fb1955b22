//! Builder for composing connectors with middleware layers.
//!
//! # Ordering
//!
//! Layers form an onion around the raw connector. The `layers` vector stores
//! them outermost-first (last added = outermost) and `build()` applies them in
//! reverse:
//!
//! ```text
//! builder.with_quota(..).with_blacklist(..)
//!
//! Storage: [Blacklist, Quota]
//! Result:  Blacklist(Quota(Raw))
//! ```
//!
//! With this order a quota refusal is seen by the blacklist layer, which then
//! benches the connector until the quota window resets.

use std::sync::Arc;
use std::time::Duration;

use gridfeed_core::Middleware;
use gridfeed_core::connector::GridConnector;
use gridfeed_types::{QuotaConfig, QuotaWindow};
use serde_json::json;

use crate::blacklist::BlacklistMiddleware;
use crate::quota::QuotaMiddleware;

const QUOTA: &str = "QuotaAwareConnector";
const BLACKLIST: &str = "BlacklistingMiddleware";

/// Composes a raw connector with layered wrappers.
pub struct ConnectorBuilder {
    raw: Arc<dyn GridConnector>,
    /// Outermost first.
    layers: Vec<Box<dyn Middleware>>,
}

impl ConnectorBuilder {
    /// Start from a raw, unwrapped connector.
    #[must_use]
    pub fn new(raw: Arc<dyn GridConnector>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    fn existing_quota_config(&self) -> Option<QuotaConfig> {
        let layer = self.layers.iter().find(|m| m.name() == QUOTA)?;
        let cfg = layer.config_json();
        let defaults = QuotaConfig::default();
        let limit = cfg
            .get("limit")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.limit);
        let warn_remaining = cfg
            .get("warn_remaining")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.warn_remaining);
        let window = match cfg.get("window_ms").and_then(serde_json::Value::as_u64) {
            Some(ms) => QuotaWindow::Rolling(Duration::from_millis(ms)),
            None => QuotaWindow::UtcDay,
        };
        Some(QuotaConfig {
            limit,
            warn_remaining,
            window,
        })
    }

    /// Add or replace the quota layer at the outermost position.
    #[must_use]
    pub fn with_quota(mut self, cfg: &QuotaConfig) -> Self {
        self.layers.retain(|m| m.name() != QUOTA);
        self.layers
            .insert(0, Box::new(QuotaMiddleware::new(cfg.clone())));
        self
    }

    /// Remove the quota layer if present.
    #[must_use]
    pub fn without_quota(mut self) -> Self {
        self.layers.retain(|m| m.name() != QUOTA);
        self
    }

    /// Set the quota limit, keeping any existing window and warning threshold.
    #[must_use]
    pub fn quota_limit(self, limit: u64) -> Self {
        let mut cfg = self.existing_quota_config().unwrap_or_default();
        cfg.limit = limit;
        self.with_quota(&cfg)
    }

    /// Add or replace the cool-down layer at the outermost position.
    #[must_use]
    pub fn with_blacklist(mut self, duration: Duration) -> Self {
        self.layers.retain(|m| m.name() != BLACKLIST);
        self.layers
            .insert(0, Box::new(BlacklistMiddleware::new(duration)));
        self
    }

    /// Remove the cool-down layer if present.
    #[must_use]
    pub fn without_blacklist(mut self) -> Self {
        self.layers.retain(|m| m.name() != BLACKLIST);
        self
    }

    /// Add an arbitrary layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Layer names and configuration, outermost first, ending with the raw connector.
    #[must_use]
    pub fn describe(&self) -> Vec<(&'static str, serde_json::Value)> {
        self.layers
            .iter()
            .map(|l| (l.name(), l.config_json()))
            .chain(std::iter::once((
                "RawConnector",
                json!({ "name": self.raw.name() }),
            )))
            .collect()
    }

    /// Apply the layers innermost-first and return the outermost connector.
    #[must_use]
    pub fn build(self) -> Arc<dyn GridConnector> {
        let mut acc: Arc<dyn GridConnector> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
