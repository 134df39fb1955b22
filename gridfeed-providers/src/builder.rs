use std::sync::Arc;
use std::time::Duration;

use gridfeed_core::FetchError;
use gridfeed_core::connector::GridConnector;
use gridfeed_middleware::ConnectorBuilder as GenericConnectorBuilder;
use gridfeed_types::QuotaConfig;

use crate::RebaseConnector;
use crate::transport::HttpTransport;

/// Builder type alias specialized for the site feed.
pub type RebaseConnectorBuilder = GenericConnectorBuilder;

impl RebaseConnector {
    /// Returns an unlayered builder around the default connector.
    ///
    /// Customize with the builder methods before calling `.build()`.
    ///
    /// # Errors
    /// Returns `Protocol` if the built-in endpoint cannot be parsed.
    pub fn builder(api_key: impl Into<String>) -> Result<RebaseConnectorBuilder, FetchError> {
        let raw: Arc<dyn GridConnector> = Arc::new(Self::new_raw(api_key)?);
        Ok(GenericConnectorBuilder::new(raw))
    }

    /// Returns a builder carrying the session budget (50 calls per UTC day)
    /// and a five minute cool-down after transient failures.
    ///
    /// # Errors
    /// Returns `Protocol` if the built-in endpoint cannot be parsed.
    pub fn rate_limited(api_key: impl Into<String>) -> Result<RebaseConnectorBuilder, FetchError> {
        let raw: Arc<dyn GridConnector> = Arc::new(Self::new_raw(api_key)?);
        Ok(Self::budgeted(raw))
    }

    /// Same layering as [`RebaseConnector::rate_limited`] over an explicit endpoint and transport.
    ///
    /// # Errors
    /// Returns `Protocol` if `base_url` is not a valid URL.
    pub fn rate_limited_with(
        api_key: impl Into<String>,
        base_url: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<RebaseConnectorBuilder, FetchError> {
        let raw: Arc<dyn GridConnector> =
            Arc::new(Self::with_transport(api_key, base_url, transport)?);
        Ok(Self::budgeted(raw))
    }

    fn budgeted(raw: Arc<dyn GridConnector>) -> RebaseConnectorBuilder {
        GenericConnectorBuilder::new(raw)
            .with_quota(&QuotaConfig::default())
            .with_blacklist(Duration::from_secs(5 * 60))
    }
}
