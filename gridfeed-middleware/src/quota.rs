//! Quota-aware connector wrapper.
//!
//! Counts every role call against a request budget and refuses calls with
//! `FetchError::RateLimit` once the budget for the current window is spent.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridfeed_core::connector::{
    CarbonProvider, GridConnector, MarketProvider, SiteProvider, WeatherProvider,
};
use gridfeed_core::{
    Capability, FetchError, FetchQuery, Middleware, PowerBreakdown, ProviderResult, Site,
};
use gridfeed_types::{QuotaConfig, QuotaState, QuotaWindow};

const MS_PER_DAY: i64 = 86_400_000;

/// Wall-clock source; injectable so day rollover can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wrapper that enforces a request budget on its inner connector.
pub struct QuotaAwareConnector {
    inner: Arc<dyn GridConnector>,
    config: QuotaConfig,
    clock: Clock,
    runtime: Mutex<QuotaRuntime>,
}

struct QuotaRuntime {
    origin: DateTime<Utc>,
    window_index: i64,
    used: u64,
}

impl QuotaAwareConnector {
    /// Wrap `inner` using the system clock.
    pub fn new(inner: Arc<dyn GridConnector>, config: QuotaConfig) -> Self {
        Self::with_clock(inner, config, Arc::new(Utc::now))
    }

    /// Wrap `inner` using a custom clock.
    pub fn with_clock(inner: Arc<dyn GridConnector>, config: QuotaConfig, clock: Clock) -> Self {
        let origin = clock();
        let window_index = index_at(&config.window, origin, origin);
        Self {
            inner,
            config,
            clock,
            runtime: Mutex::new(QuotaRuntime {
                origin,
                window_index,
                used: 0,
            }),
        }
    }

    /// Access the inner connector.
    pub fn inner(&self) -> &Arc<dyn GridConnector> {
        &self.inner
    }

    /// Budget snapshot without consuming a unit.
    pub fn state(&self) -> QuotaState {
        let now = (self.clock)();
        let mut rt = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        self.roll(&mut rt, now);
        self.snapshot(&rt, now)
    }

    /// Consume one unit of budget.
    ///
    /// # Errors
    /// Returns `FetchError::RateLimit` carrying the time to the next reset when
    /// the current window is exhausted.
    pub fn should_allow_call(&self) -> Result<QuotaState, FetchError> {
        let now = (self.clock)();
        let mut rt = self.runtime.lock().unwrap_or_else(PoisonError::into_inner);
        self.roll(&mut rt, now);
        if rt.used >= self.config.limit {
            let state = self.snapshot(&rt, now);
            drop(rt);
            let reset_ms = u64::try_from(state.reset_in.as_millis()).unwrap_or(u64::MAX);
            #[cfg(feature = "tracing")]
            tracing::warn!(
                connector = self.inner.name(),
                reset_in_ms = reset_ms,
                "request quota exhausted"
            );
            return Err(FetchError::rate_limit(self.inner.name(), Some(reset_ms)));
        }
        rt.used += 1;
        let state = self.snapshot(&rt, now);
        drop(rt);
        if state.is_low(self.config.warn_remaining) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                connector = self.inner.name(),
                remaining = state.remaining,
                limit = state.limit,
                "request quota running low"
            );
        }
        Ok(state)
    }

    fn roll(&self, rt: &mut QuotaRuntime, now: DateTime<Utc>) {
        let idx = index_at(&self.config.window, rt.origin, now);
        if idx != rt.window_index {
            rt.window_index = idx;
            rt.used = 0;
        }
    }

    fn snapshot(&self, rt: &QuotaRuntime, now: DateTime<Utc>) -> QuotaState {
        let reset_at = reset_at(&self.config.window, rt.origin, rt.window_index);
        let reset_in = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
        QuotaState {
            limit: self.config.limit,
            remaining: self.config.limit.saturating_sub(rt.used),
            reset_in,
        }
    }
}

fn window_ms(window: &QuotaWindow) -> i64 {
    match window {
        QuotaWindow::UtcDay => MS_PER_DAY,
        QuotaWindow::Rolling(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX).max(1),
    }
}

fn index_at(window: &QuotaWindow, origin: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    match window {
        QuotaWindow::UtcDay => now.timestamp_millis().div_euclid(MS_PER_DAY),
        QuotaWindow::Rolling(_) => {
            (now - origin).num_milliseconds().div_euclid(window_ms(window))
        }
    }
}

fn reset_at(window: &QuotaWindow, origin: DateTime<Utc>, index: i64) -> DateTime<Utc> {
    let next = index.saturating_add(1).saturating_mul(window_ms(window));
    match window {
        QuotaWindow::UtcDay => DateTime::from_timestamp_millis(next).unwrap_or(origin),
        QuotaWindow::Rolling(_) => origin + chrono::Duration::milliseconds(next),
    }
}

/// Middleware config for constructing a [`QuotaAwareConnector`].
pub struct QuotaMiddleware {
    /// Budget applied to the wrapped connector.
    pub config: QuotaConfig,
}

impl QuotaMiddleware {
    /// Layer with the given budget.
    #[must_use]
    pub const fn new(config: QuotaConfig) -> Self {
        Self { config }
    }
}

impl Middleware for QuotaMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn GridConnector>) -> Arc<dyn GridConnector> {
        Arc::new(QuotaAwareConnector::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "QuotaAwareConnector"
    }

    fn config_json(&self) -> serde_json::Value {
        let window_ms = match self.config.window {
            QuotaWindow::UtcDay => serde_json::Value::Null,
            QuotaWindow::Rolling(d) => serde_json::json!(d.as_millis()),
        };
        serde_json::json!({
            "limit": self.config.limit,
            "warn_remaining": self.config.warn_remaining,
            "utc_day": matches!(self.config.window, QuotaWindow::UtcDay),
            "window_ms": window_ms,
        })
    }
}

fn unsupported(name: &str, cap: Capability) -> FetchError {
    FetchError::unsupported(name, cap.as_str())
}

impl GridConnector for QuotaAwareConnector {
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
impl MarketProvider for QuotaAwareConnector {
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let inner = self
            .inner
            .as_market_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Market))?;
        self.should_allow_call()?;
        inner.market(query).await
    }
}

#[async_trait]
impl CarbonProvider for QuotaAwareConnector {
    async fn carbon_intensity(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let inner = self
            .inner
            .as_carbon_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Carbon))?;
        self.should_allow_call()?;
        inner.carbon_intensity(query).await
    }

    async fn power_breakdown(&self, query: &FetchQuery) -> Result<PowerBreakdown, FetchError> {
        let inner = self
            .inner
            .as_carbon_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Carbon))?;
        self.should_allow_call()?;
        inner.power_breakdown(query).await
    }
}

#[async_trait]
impl WeatherProvider for QuotaAwareConnector {
    async fn weather(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let inner = self
            .inner
            .as_weather_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Weather))?;
        self.should_allow_call()?;
        inner.weather(query).await
    }
}

#[async_trait]
impl SiteProvider for QuotaAwareConnector {
    async fn sites(&self) -> Result<Vec<Site>, FetchError> {
        let inner = self
            .inner
            .as_site_provider()
            .ok_or_else(|| unsupported(self.name(), Capability::Sites))?;
        self.should_allow_call()?;
        inner.sites().await
    }
}
