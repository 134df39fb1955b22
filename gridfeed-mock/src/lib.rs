//! Deterministic mock connector for tests.
//!
//! Every role answers from fixed fixture formulas unless a behavior override
//! is installed for its capability. Calls are counted per capability so tests
//! can assert on cache hits and fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use gridfeed_core::connector::{
    CarbonProvider, GridConnector, MarketProvider, SiteProvider, WeatherProvider,
};
use gridfeed_core::{
    Capability, FetchError, FetchQuery, PowerBreakdown, ProviderResult, Site, TimeSeriesPoint,
};

mod fixtures;

pub use fixtures::{fixture_sites, fixture_value};

/// Instruction for how calls for one capability should behave.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return fixture data immediately.
    Return,
    /// Return a successful but empty payload (no points, no sites).
    Empty,
    /// Fail immediately with the provided error.
    Fail(FetchError),
    /// Sleep, then return fixture data.
    Delay(Duration),
    /// Never complete (simulate a stalled connection).
    Hang,
}

/// Mock connector serving fixture data for a configurable set of roles.
pub struct MockConnector {
    name: &'static str,
    roles: Vec<Capability>,
    behaviors: Mutex<HashMap<Capability, MockBehavior>>,
    calls: [AtomicUsize; 4],
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

const fn slot(cap: Capability) -> usize {
    match cap {
        Capability::Market => 0,
        Capability::Carbon => 1,
        Capability::Weather => 2,
        Capability::Sites => 3,
    }
}

impl MockConnector {
    /// A connector named `gridfeed-mock` serving every role.
    #[must_use]
    pub fn new() -> Self {
        Self::named("gridfeed-mock", &Capability::ALL)
    }

    /// A connector with a custom name serving only `roles`.
    #[must_use]
    pub fn named(name: &'static str, roles: &[Capability]) -> Self {
        Self {
            name,
            roles: roles.to_vec(),
            behaviors: Mutex::new(HashMap::new()),
            calls: Default::default(),
        }
    }

    /// Install a behavior for `cap` (builder form).
    #[must_use]
    pub fn with_behavior(self, cap: Capability, behavior: MockBehavior) -> Self {
        self.set_behavior(cap, behavior);
        self
    }

    /// Replace the behavior for `cap` on a live connector.
    pub fn set_behavior(&self, cap: Capability, behavior: MockBehavior) {
        self.behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cap, behavior);
    }

    /// Number of calls received for `cap`, including failed ones.
    #[must_use]
    pub fn calls(&self, cap: Capability) -> usize {
        self.calls[slot(cap)].load(Ordering::SeqCst)
    }

    fn has_role(&self, cap: Capability) -> bool {
        self.roles.contains(&cap)
    }

    fn behavior(&self, cap: Capability) -> MockBehavior {
        self.behaviors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cap)
            .cloned()
            .unwrap_or(MockBehavior::Return)
    }

    /// Count the call, then apply the behavior. `Ok(true)` means "serve fixtures".
    async fn enter(&self, cap: Capability) -> Result<bool, FetchError> {
        self.calls[slot(cap)].fetch_add(1, Ordering::SeqCst);
        match self.behavior(cap) {
            MockBehavior::Return => Ok(true),
            MockBehavior::Empty => Ok(false),
            MockBehavior::Fail(e) => Err(e),
            MockBehavior::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(true)
            }
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(false)
            }
        }
    }

    async fn series(&self, cap: Capability, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        let serve = self.enter(cap).await?;
        let metrics = query.metrics & cap.metrics();
        let points = if serve {
            metrics
                .metrics()
                .flat_map(|m| {
                    query
                        .window
                        .hours()
                        .map(move |ts| TimeSeriesPoint::new(ts, m, fixture_value(m, ts)))
                })
                .collect()
        } else {
            Vec::new()
        };
        Ok(ProviderResult::real(self.name, query.signature(self.name), points))
    }
}

impl GridConnector for MockConnector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn vendor(&self) -> &'static str {
        "Mock"
    }

    fn as_market_provider(&self) -> Option<&dyn MarketProvider> {
        self.has_role(Capability::Market)
            .then_some(self as &dyn MarketProvider)
    }

    fn as_carbon_provider(&self) -> Option<&dyn CarbonProvider> {
        self.has_role(Capability::Carbon)
            .then_some(self as &dyn CarbonProvider)
    }

    fn as_weather_provider(&self) -> Option<&dyn WeatherProvider> {
        self.has_role(Capability::Weather)
            .then_some(self as &dyn WeatherProvider)
    }

    fn as_site_provider(&self) -> Option<&dyn SiteProvider> {
        self.has_role(Capability::Sites)
            .then_some(self as &dyn SiteProvider)
    }
}

#[async_trait]
impl MarketProvider for MockConnector {
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        self.series(Capability::Market, query).await
    }
}

#[async_trait]
impl CarbonProvider for MockConnector {
    async fn carbon_intensity(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        self.series(Capability::Carbon, query).await
    }

    async fn power_breakdown(&self, query: &FetchQuery) -> Result<PowerBreakdown, FetchError> {
        // Not counted; shares the carbon behavior.
        match self.behavior(Capability::Carbon) {
            MockBehavior::Fail(e) => Err(e),
            _ => Ok(fixtures::breakdown(query.window.start())),
        }
    }
}

#[async_trait]
impl WeatherProvider for MockConnector {
    async fn weather(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError> {
        self.series(Capability::Weather, query).await
    }
}

#[async_trait]
impl SiteProvider for MockConnector {
    async fn sites(&self) -> Result<Vec<Site>, FetchError> {
        if self.enter(Capability::Sites).await? {
            Ok(fixture_sites())
        } else {
            Ok(Vec::new())
        }
    }
}
