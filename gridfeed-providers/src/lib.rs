//! gridfeed-providers
//!
//! HTTP connectors for the four upstream feeds: ENTSO-E market documents,
//! Electricity Maps carbon intensity, OpenWeather forecasts, and Rebase site
//! metadata. Each connector implements `GridConnector` and talks to its feed
//! through an injectable [`HttpTransport`].
#![warn(missing_docs)]

mod builder;
/// Ordered endpoint fallback.
pub mod candidates;
/// Electricity Maps connector and payload parsers.
pub mod electricity_maps;
/// ENTSO-E connector, code tables and XML parser.
pub mod entsoe;
/// OpenWeather connector and payload parsers.
pub mod openweather;
/// Rebase connector and payload parsers.
pub mod rebase;
/// HTTP transport seam.
pub mod transport;
mod wire;

use std::sync::Arc;

use gridfeed_core::connector::GridConnector;
use gridfeed_core::{Capability, FetchError, GridfeedConfig, GridfeedError};

pub use builder::RebaseConnectorBuilder;
pub use electricity_maps::ElectricityMapsConnector;
pub use entsoe::EntsoeConnector;
pub use openweather::OpenWeatherConnector;
pub use rebase::RebaseConnector;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Build every connector that has a credential in `cfg`.
///
/// All connectors share one [`ReqwestTransport`] bounded by
/// `cfg.provider_timeout`. The site connector carries its session budget and
/// cool-down layers. Order is market, carbon, weather, sites.
///
/// # Errors
/// Returns `Config` when a base URL override cannot be parsed.
pub fn connectors_from_config(
    cfg: &GridfeedConfig,
) -> Result<Vec<Arc<dyn GridConnector>>, GridfeedError> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(cfg.provider_timeout));
    let mut out: Vec<Arc<dyn GridConnector>> = Vec::new();
    let config_err = |e: FetchError| GridfeedError::Config(e.to_string());

    let settings = cfg.provider(Capability::Market);
    if let Some(token) = settings.credential {
        let base = settings
            .base_url
            .as_deref()
            .unwrap_or(EntsoeConnector::DEFAULT_BASE_URL);
        out.push(Arc::new(
            EntsoeConnector::with_transport(token, base, Arc::clone(&transport))
                .map_err(config_err)?,
        ));
    }

    let settings = cfg.provider(Capability::Carbon);
    if let Some(token) = settings.credential {
        let base = settings
            .base_url
            .as_deref()
            .unwrap_or(ElectricityMapsConnector::DEFAULT_BASE_URL);
        out.push(Arc::new(
            ElectricityMapsConnector::with_transport(token, base, Arc::clone(&transport))
                .map_err(config_err)?,
        ));
    }

    let settings = cfg.provider(Capability::Weather);
    if let Some(key) = settings.credential {
        let base = settings
            .base_url
            .as_deref()
            .unwrap_or(OpenWeatherConnector::DEFAULT_BASE_URL);
        out.push(Arc::new(
            OpenWeatherConnector::with_transport(key, base, Arc::clone(&transport))
                .map_err(config_err)?,
        ));
    }

    let settings = cfg.provider(Capability::Sites);
    if let Some(key) = settings.credential {
        let base = settings
            .base_url
            .as_deref()
            .unwrap_or(RebaseConnector::DEFAULT_BASE_URL);
        out.push(
            RebaseConnector::rate_limited_with(key, base, Arc::clone(&transport))
                .map_err(config_err)?
                .build(),
        );
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        connectors = out.len(),
        names = ?out.iter().map(|c| c.name()).collect::<Vec<_>>(),
        "connectors built from configuration"
    );
    Ok(out)
}
