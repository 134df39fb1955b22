use std::sync::Arc;
use std::time::Duration;

use gridfeed_core::connector::GridConnector;
use gridfeed_core::{
    AggregationObserver, CacheConfig, Capability, FetchError, GridfeedConfig, GridfeedError, Site,
};
use gridfeed_middleware::ResultCache;

use crate::registry::SiteRegistry;

/// Orchestrator that fans requests out across registered connectors and
/// absorbs their failures with synthetic data.
pub struct Gridfeed {
    pub(crate) connectors: Vec<Arc<dyn GridConnector>>,
    pub(crate) cfg: GridfeedConfig,
    pub(crate) cache: ResultCache,
    pub(crate) observer: Arc<dyn AggregationObserver>,
    pub(crate) registry: SiteRegistry,
}

/// Builder for constructing a `Gridfeed` orchestrator with custom configuration.
pub struct GridfeedBuilder {
    connectors: Vec<Arc<dyn GridConnector>>,
    cfg: GridfeedConfig,
    observer: Option<Arc<dyn AggregationObserver>>,
    static_sites: Option<Vec<Site>>,
}

impl Default for GridfeedBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GridfeedBuilder {
    /// Create a new builder with sensible defaults.
    ///
    /// Behavior and trade-offs:
    /// - Starts with no connectors; register at least one via [`Self::with_connector`]
    ///   or enable [`Self::force_synthetic`].
    /// - Defaults: 10s provider timeout, no overall request deadline, default cache TTLs,
    ///   two decimal places of coordinate precision in cache keys.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connectors: vec![],
            cfg: GridfeedConfig::default(),
            observer: None,
            static_sites: None,
        }
    }

    /// Start from a loaded configuration (timeouts, cache TTLs, synthesis flag).
    ///
    /// Credentials in `cfg` are not turned into connectors here; see
    /// [`Gridfeed::from_config`] for that.
    #[must_use]
    pub fn config(mut self, cfg: GridfeedConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Register a provider connector.
    ///
    /// Behavior and trade-offs:
    /// - Registration order is the order in which connectors serving the same
    ///   capability are tried; the first real result wins.
    /// - Duplicates are not deduplicated; avoid registering the same connector twice.
    #[must_use]
    pub fn with_connector(mut self, c: Arc<dyn GridConnector>) -> Self {
        self.connectors.push(c);
        self
    }

    /// Set the per-connector call timeout.
    ///
    /// A call that exceeds it is abandoned and its capability is synthesized.
    #[must_use]
    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout = timeout;
        self
    }

    /// Set an overall deadline for each capability of one aggregation.
    ///
    /// Behavior and trade-offs:
    /// - Bounds total latency when several connectors for one capability time out in turn.
    /// - When exceeded, the capability is synthesized; other capabilities are unaffected.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.request_timeout = Some(timeout);
        self
    }

    /// Skip every connector and serve synthetic data only.
    #[must_use]
    pub const fn force_synthetic(mut self, yes: bool) -> Self {
        self.cfg.force_synthetic = yes;
        self
    }

    /// Replace the cache TTL configuration.
    #[must_use]
    pub fn cache_config(mut self, cache: CacheConfig) -> Self {
        self.cfg.cache = cache;
        self
    }

    /// Decimal places of the coordinate kept in cache keys.
    #[must_use]
    pub const fn location_precision(mut self, places: u8) -> Self {
        self.cfg.location_precision = places;
        self
    }

    /// Install an observer for fetch, cache and synthesis events.
    ///
    /// Without one, events go to `tracing` when that feature is on and are
    /// dropped otherwise.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn AggregationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the built-in site list used when no site feed answers.
    #[must_use]
    pub fn static_sites(mut self, sites: Vec<Site>) -> Self {
        self.static_sites = Some(sites);
        self
    }

    /// Build the `Gridfeed` orchestrator.
    ///
    /// # Errors
    /// Returns `NoConnectors` if no connector was registered and synthesis is not forced.
    pub fn build(self) -> Result<Gridfeed, GridfeedError> {
        if self.connectors.is_empty() && !self.cfg.force_synthetic {
            return Err(GridfeedError::NoConnectors);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            connectors = ?self.connectors.iter().map(|c| c.name()).collect::<Vec<_>>(),
            force_synthetic = self.cfg.force_synthetic,
            "building gridfeed"
        );

        let observer = self.observer.unwrap_or_else(default_observer);
        let registry = self
            .static_sites
            .map_or_else(SiteRegistry::default, SiteRegistry::new);
        Ok(Gridfeed {
            cache: ResultCache::new(&self.cfg.cache),
            connectors: self.connectors,
            cfg: self.cfg,
            observer,
            registry,
        })
    }
}

#[cfg(feature = "tracing")]
fn default_observer() -> Arc<dyn AggregationObserver> {
    Arc::new(gridfeed_core::TracingObserver)
}

#[cfg(not(feature = "tracing"))]
fn default_observer() -> Arc<dyn AggregationObserver> {
    Arc::new(gridfeed_core::NoopObserver)
}

impl Gridfeed {
    /// Wrap a connector future with a timeout and standardized timeout error mapping.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "gridfeed::core::provider_call_with_timeout",
            skip(fut),
            fields(
                connector = connector_name,
                capability = %capability,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ),
        )
    )]
    pub(crate) async fn provider_call_with_timeout<T, Fut>(
        connector_name: &'static str,
        capability: Capability,
        timeout: Duration,
        fut: Fut,
    ) -> Result<T, FetchError>
    where
        Fut: core::future::Future<Output = Result<T, FetchError>>,
    {
        (tokio::time::timeout(timeout, fut).await)
            .unwrap_or_else(|_| Err(FetchError::timeout(connector_name, timeout)))
    }

    /// Start building a new `Gridfeed` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use gridfeed_providers::{EntsoeConnector, OpenWeatherConnector};
    ///
    /// let feed = gridfeed::Gridfeed::builder()
    ///     .with_connector(Arc::new(EntsoeConnector::new("token")?))
    ///     .with_connector(Arc::new(OpenWeatherConnector::new("key")?))
    ///     .provider_timeout(std::time::Duration::from_secs(5))
    ///     .build()?;
    /// ```
    #[must_use]
    pub fn builder() -> GridfeedBuilder {
        GridfeedBuilder::new()
    }

    /// Build an orchestrator with one connector per credential found in `cfg`.
    ///
    /// With no credentials at all, the orchestrator still builds and serves
    /// synthetic data for every request.
    ///
    /// # Errors
    /// Returns `Config` when a base URL override cannot be parsed.
    pub fn from_config(cfg: GridfeedConfig) -> Result<Self, GridfeedError> {
        let connectors = gridfeed_providers::connectors_from_config(&cfg)?;
        let mut cfg = cfg;
        if connectors.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::warn!("no provider credentials configured; serving synthetic data only");
            cfg.force_synthetic = true;
        }
        connectors
            .into_iter()
            .fold(GridfeedBuilder::new().config(cfg), GridfeedBuilder::with_connector)
            .build()
    }

    /// [`Gridfeed::from_config`] over the process environment.
    ///
    /// # Errors
    /// Returns `Config` for unparseable settings or base URLs.
    pub fn from_env() -> Result<Self, GridfeedError> {
        Self::from_config(GridfeedConfig::from_env()?)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GridfeedConfig {
        &self.cfg
    }

    /// Registered connectors, in registration order.
    #[must_use]
    pub fn connectors(&self) -> &[Arc<dyn GridConnector>] {
        &self.connectors
    }

    /// Connectors able to serve `cap`, in registration order.
    pub(crate) fn eligible(&self, cap: Capability) -> Vec<Arc<dyn GridConnector>> {
        self.connectors
            .iter()
            .filter(|c| c.supports(cap))
            .cloned()
            .collect()
    }
}
