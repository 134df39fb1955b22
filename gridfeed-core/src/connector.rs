use async_trait::async_trait;

pub use gridfeed_types::ConnectorKey;
use gridfeed_types::{Capability, FetchError, FetchQuery, PowerBreakdown, ProviderResult, Site};

/// Focused role trait for connectors that serve day-ahead prices, generation, and load.
#[async_trait]
pub trait MarketProvider: Send + Sync {
    /// Fetch the requested market metrics for the query window.
    async fn market(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError>;
}

/// Focused role trait for connectors that serve grid carbon data.
#[async_trait]
pub trait CarbonProvider: Send + Sync {
    /// Fetch carbon intensity for the query window.
    async fn carbon_intensity(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError>;

    /// Fetch the latest production breakdown for the query location.
    async fn power_breakdown(&self, query: &FetchQuery) -> Result<PowerBreakdown, FetchError>;
}

/// Focused role trait for connectors that serve weather observations and forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the requested weather metrics for the query window.
    async fn weather(&self, query: &FetchQuery) -> Result<ProviderResult, FetchError>;
}

/// Focused role trait for connectors that serve site metadata.
#[async_trait]
pub trait SiteProvider: Send + Sync {
    /// Fetch every site visible to the configured account.
    async fn sites(&self) -> Result<Vec<Site>, FetchError>;
}

/// Unified connector interface.
///
/// A connector advertises each role it implements by returning a trait object
/// from the matching `as_*_provider` accessor. Adapters hold no mutable state
/// that outlives a call, so the orchestrator may invoke them concurrently.
pub trait GridConnector: Send + Sync {
    /// A stable identifier used in cache keys and outcome reports (e.g., "gridfeed-entsoe").
    fn name(&self) -> &'static str;

    /// Canonical connector key constructed from the static name.
    fn key(&self) -> ConnectorKey {
        ConnectorKey::new(self.name())
    }

    /// Human-friendly vendor string.
    fn vendor(&self) -> &'static str {
        "unknown"
    }

    /// Advertise market capability.
    fn as_market_provider(&self) -> Option<&dyn MarketProvider> {
        None
    }

    /// Advertise carbon capability.
    fn as_carbon_provider(&self) -> Option<&dyn CarbonProvider> {
        None
    }

    /// Advertise weather capability.
    fn as_weather_provider(&self) -> Option<&dyn WeatherProvider> {
        None
    }

    /// Advertise site metadata capability.
    fn as_site_provider(&self) -> Option<&dyn SiteProvider> {
        None
    }

    /// Whether this connector implements the role behind `cap`.
    fn supports(&self, cap: Capability) -> bool {
        match cap {
            Capability::Market => self.as_market_provider().is_some(),
            Capability::Carbon => self.as_carbon_provider().is_some(),
            Capability::Weather => self.as_weather_provider().is_some(),
            Capability::Sites => self.as_site_provider().is_some(),
        }
    }
}
