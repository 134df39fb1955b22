//! Site registry: live site feed with a built-in fallback list.

use std::sync::Arc;

use tokio::time::Instant;

use gridfeed_core::connector::GridConnector;
use gridfeed_core::{
    Capability, Coordinate, FetchError, GridfeedError, Site, SiteStatus, Technology,
};

use crate::core::Gridfeed;

/// The four reference sites served when no site feed answers.
#[must_use]
pub fn builtin_sites() -> Vec<Site> {
    let site = |id: &str, name: &str, latitude, longitude, capacity_mw, technology| Site {
        id: id.to_string(),
        name: name.to_string(),
        coordinate: Coordinate {
            latitude,
            longitude,
        },
        capacity_mw,
        technology,
        status: SiteStatus::Active,
    };
    vec![
        site(
            "site-001",
            "Stockholm Solar Farm",
            59.3293,
            18.0686,
            50.0,
            Technology::Solar,
        ),
        site(
            "site-002",
            "Gotland Wind Farm",
            57.4684,
            18.4867,
            120.0,
            Technology::Wind,
        ),
        site(
            "site-003",
            "Malmö Offshore Wind",
            55.6050,
            13.0038,
            200.0,
            Technology::WindOffshore,
        ),
        site(
            "site-004",
            "Västerås Hydro Plant",
            59.6162,
            16.5528,
            75.0,
            Technology::Hydro,
        ),
    ]
}

/// Where a site list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteSource {
    /// Served from the result cache.
    Cached,
    /// Fetched from a site feed.
    Live,
    /// The fallback list.
    Static,
}

/// Static fallback list owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    fallback: Arc<Vec<Site>>,
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::new(builtin_sites())
    }
}

impl SiteRegistry {
    /// Registry falling back to `sites`.
    #[must_use]
    pub fn new(sites: Vec<Site>) -> Self {
        Self {
            fallback: Arc::new(sites),
        }
    }

    /// The fallback list.
    #[must_use]
    pub fn fallback(&self) -> Arc<Vec<Site>> {
        Arc::clone(&self.fallback)
    }
}

/// Cache slot remembering that no feed answered, so the fallback list is
/// served until the sites TTL runs out.
const FALLBACK_SLOT: &str = "gridfeed-static";

impl Gridfeed {
    /// Current site list and where it came from.
    ///
    /// Site feeds are tried in registration order; the first non-empty list wins
    /// and is cached. An empty list, a failure, or a timeout moves on to the
    /// next feed. When none answers, the static list is returned and that
    /// outcome is cached too, so a dead feed is not retried until the sites
    /// TTL expires. This never fails.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "gridfeed::registry::sites", skip(self))
    )]
    pub async fn sites_with_source(&self) -> (Arc<Vec<Site>>, SiteSource) {
        match self.known_sites().await {
            Some(known) => known,
            None => self.refresh_sites().await,
        }
    }

    /// Current site list; see [`Gridfeed::sites_with_source`].
    pub async fn sites(&self) -> Arc<Vec<Site>> {
        self.sites_with_source().await.0
    }

    /// Look up one site by id.
    ///
    /// # Errors
    /// Returns `UnknownSite` when the id is not in the current list.
    pub async fn site(&self, id: &str) -> Result<Site, GridfeedError> {
        find(&self.sites().await, id)
    }

    /// Site metadata for an aggregation, without waiting on a feed when possible.
    ///
    /// A fresh cached list answers directly. On a cold cache a site found in
    /// the fallback list is returned together with `true`, meaning the caller
    /// should refresh the feed alongside its own fetches. Only an id missing
    /// from the fallback list waits for the feed.
    pub(crate) async fn locate_site(&self, id: &str) -> Result<(Site, bool), GridfeedError> {
        if let Some((sites, _)) = self.known_sites().await {
            return find(&sites, id).map(|s| (s, false));
        }
        if let Ok(site) = find(&self.registry.fallback, id) {
            return Ok((site, true));
        }
        let (sites, _) = self.refresh_sites().await;
        find(&sites, id).map(|s| (s, false))
    }

    /// The list that needs no network call: forced or feedless fallback, or
    /// a cached list (live or remembered fallback).
    async fn known_sites(&self) -> Option<(Arc<Vec<Site>>, SiteSource)> {
        let feeds = self.eligible(Capability::Sites);
        if self.cfg.force_synthetic || feeds.is_empty() {
            return Some((self.registry.fallback(), SiteSource::Static));
        }
        for c in &feeds {
            if let Some(hit) = self.cache.get_sites(c.name()).await {
                return Some((hit, SiteSource::Cached));
            }
        }
        self.cache
            .get_sites(FALLBACK_SLOT)
            .await
            .map(|fallback| (fallback, SiteSource::Static))
    }

    /// Ask every feed in order; remember the fallback when none answers.
    pub(crate) async fn refresh_sites(&self) -> (Arc<Vec<Site>>, SiteSource) {
        for c in &self.eligible(Capability::Sites) {
            let started = Instant::now();
            match self.fetch_sites(c.as_ref()).await {
                Ok(sites) => {
                    self.observer.on_fetch_succeeded(
                        Capability::Sites,
                        c.name(),
                        started.elapsed(),
                        sites.len(),
                    );
                    let sites = Arc::new(sites);
                    self.cache.put_sites(c.name(), Arc::clone(&sites)).await;
                    return (sites, SiteSource::Live);
                }
                Err(e) => self.observer.on_fetch_failed(Capability::Sites, c.name(), &e),
            }
        }
        #[cfg(feature = "tracing")]
        tracing::info!(sites = self.registry.fallback.len(), "using built-in site list");
        let fallback = self.registry.fallback();
        self.cache.put_sites(FALLBACK_SLOT, Arc::clone(&fallback)).await;
        (fallback, SiteSource::Static)
    }

    async fn fetch_sites(&self, c: &dyn GridConnector) -> Result<Vec<Site>, FetchError> {
        let name = c.name();
        let provider = c
            .as_site_provider()
            .ok_or_else(|| FetchError::unsupported(name, Capability::Sites.as_str()))?;
        let sites = Self::provider_call_with_timeout(
            name,
            Capability::Sites,
            self.cfg.provider_timeout,
            provider.sites(),
        )
        .await?;
        if sites.is_empty() {
            return Err(FetchError::provider(name, "site feed returned no sites"));
        }
        Ok(sites)
    }
}

fn find(sites: &[Site], id: &str) -> Result<Site, GridfeedError> {
    sites
        .iter()
        .find(|s| s.id == id)
        .cloned()
        .ok_or_else(|| GridfeedError::unknown_site(id))
}
