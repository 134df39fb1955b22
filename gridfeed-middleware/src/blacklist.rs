use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use gridfeed_core::connector::{
    CarbonProvider, GridConnector, MarketProvider, SiteProvider, WeatherProvider,
};
use gridfeed_core::{
    Capability, FetchError, FetchQuery, Middleware, PowerBreakdown, ProviderResult, Site,
};
use tokio::time::Instant;

/// Middleware that benches its inner connector for a cool-down period after a
/// rate-limit or authorization failure.
///
/// While benched, calls fail immediately with the error that triggered the
/// cool-down, without reaching the network.
pub struct BlacklistingMiddleware {
    inner: Arc<dyn GridConnector>,
    // (benched-until, triggering error); None means active
    state: Mutex<Option<(Instant, FetchError)>>,
    default_duration: Duration,
}

impl BlacklistingMiddleware {
    /// Wrap `inner`; `default_duration` applies when the error carries no retry hint.
    pub fn new(inner: Arc<dyn GridConnector>, default_duration: Duration) -> Self {
        Self {
            inner,
            state: Mutex::new(None),
            default_duration,
        }
    }

    /// Whether calls are currently short-circuited.
    pub fn is_blacklisted(&self) -> bool {
        self.check().is_err()
    }

    fn check(&self) -> Result<(), FetchError> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if let Some((until, err)) = guard.as_ref() {
            if now < *until {
                return Err(match err {
                    FetchError::RateLimit { provider, .. } => {
                        let left = until.duration_since(now).as_millis();
                        FetchError::rate_limit(provider.clone(), u64::try_from(left).ok())
                    }
                    other => other.clone(),
                });
            }
            *guard = None;
        }
        Ok(())
    }

    fn observe<T>(&self, result: Result<T, FetchError>) -> Result<T, FetchError> {
        result.map_err(|err| self.bench_on(err))
    }

    fn bench_on(&self, err: FetchError) -> FetchError {
        let cooldown = match &err {
            FetchError::RateLimit {
                retry_after_ms: Some(ms),
                ..
            } if *ms > 0 => Some(Duration::from_millis(*ms)),
            FetchError::RateLimit { .. } | FetchError::Auth { .. } => Some(self.default_duration),
            _ => None,
        };
        if let Some(cooldown) = cooldown {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                connector = self.inner.name(),
                cooldown_ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "benching connector"
            );
            let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            *guard = Some((Instant::now() + cooldown, err.clone()));
        }
        err
    }
}

/// Declarative layer that wraps a connector in [`BlacklistingMiddleware`].
pub struct BlacklistMiddleware {
    duration: Duration,
}

impl BlacklistMiddleware {
    /// Layer with the given default cool-down.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Middleware for BlacklistMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn GridConnector>) -> Arc<dyn GridConnector> {
        Arc::new(BlacklistingMiddleware::new(inner, self.duration))
    }

    fn name(&self) -> &'static str {
        "BlacklistingMiddleware"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({ "duration_ms": self.duration.as_millis() })
    }
}

fn unsupported(name: &str, cap: Capability) -> FetchError {
    FetchError::unsupported(name, cap.as_str())
}

impl GridConnector for BlacklistingMiddleware {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn vendor(&self) -> &'static str {
        self.inner.vendor()
    }

    fn as_market_provider(&self) -> Option<&dyn MarketProvider> {
        self.inner
            .as_market_provider()
            .map(|_| self as &dyn MarketProvider)
    }

    fn as_carbon_provider(&self) -> Option<&dyn CarbonProvider> {
        self.inner
            .as_carbon_provider()
            .map(|_| self as &dyn CarbonProvider)
    }

    fn as_weather_provider(&self) -> Option<&dyn WeatherProvider> {
        self.inner
            .as_weather_provider()
            .map(|_| self as &dyn WeatherProvider)
    }

    fn as_site_provider(&self) -> Option<&dyn SiteProvider> {
        self.inner
            .as_site_provider()
            .map(|_| self as &dyn SiteProvider)
    }
}

#[async_trait]
impl MarketProvider for BlacklistingMiddleware {
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        self.check()?;
        let inner = self
            .inner
            .as_market_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Market))?;
        self.observe(inner.market(query).await)
    }
}

#[async_trait]
impl CarbonProvider for BlacklistingMiddleware {
    async fn carbon_intensity(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        self.check()?;
        let inner = self
            .inner
            .as_carbon_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Carbon))?;
        self.observe(inner.carbon_intensity(query).await)
    }

    async fn power_breakdown(&self, query: &FetchQuery) -> Result<PowerBreakdown, FetchError> {
        self.check()?;
        let inner = self
            .inner
            .as_carbon_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Carbon))?;
        self.observe(inner.power_breakdown(query).await)
    }
}

#[async_trait]
impl WeatherProvider for BlacklistingMiddleware {
    async fn weather(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        self.check()?;
        let inner = self
            .inner
            .as_weather_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Weather))?;
        self.observe(inner.weather(query).await)
    }
}

#[async_trait]
impl SiteProvider for BlacklistingMiddleware {
    async fn sites(&self) -> Result<Vec<Site>, FetchError> {
        self.check()?;
        let inner = self
            .inner
            .as_site_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Sites))?;
        self.observe(inner.sites().await)
    }
}
