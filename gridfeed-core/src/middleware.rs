//! Layering interface for connector wrappers.

use std::sync::Arc;

use crate::connector::GridConnector;

/// A layer that wraps a `GridConnector` with extra behavior (quota, cool-down).
///
/// Layers take ownership of themselves on `apply` so stateful wrappers can move
/// their configuration into the connector they produce.
pub trait Middleware: Send + Sync {
    /// Wrap `inner` and return the wrapped connector.
    fn apply(self: Box<Self>, inner: Arc<dyn GridConnector>) -> Arc<dyn GridConnector>;

    /// Layer name for logs.
    fn name(&self) -> &'static str;

    /// Configuration snapshot for diagnostics.
    fn config_json(&self) -> serde_json::Value;
}
