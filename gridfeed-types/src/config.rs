//! Configuration types shared across orchestrators and connectors.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::GridfeedError;

/// TTL configuration for the result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL used when a capability has no override, in milliseconds.
    pub default_ttl_ms: u64,
    /// Per-capability TTL overrides keyed by [`Capability::as_str`]; 0 disables caching.
    pub per_capability_ttl_ms: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let mut per_capability_ttl_ms = HashMap::new();
        per_capability_ttl_ms.insert(Capability::Market.as_str().to_string(), 60 * 60 * 1000);
        per_capability_ttl_ms.insert(Capability::Carbon.as_str().to_string(), 15 * 60 * 1000);
        per_capability_ttl_ms.insert(Capability::Weather.as_str().to_string(), 30 * 60 * 1000);
        per_capability_ttl_ms.insert(
            Capability::Sites.as_str().to_string(),
            24 * 60 * 60 * 1000,
        );
        Self {
            default_ttl_ms: 15 * 60 * 1000,
            per_capability_ttl_ms,
        }
    }
}

impl CacheConfig {
    /// TTL for a capability, or `None` when caching is disabled for it.
    #[must_use]
    pub fn ttl_for(&self, cap: Capability) -> Option<Duration> {
        let ms = self
            .per_capability_ttl_ms
            .get(cap.as_str())
            .copied()
            .unwrap_or(self.default_ttl_ms);
        (ms > 0).then(|| Duration::from_millis(ms))
    }

    /// Override the TTL for one capability.
    #[must_use]
    pub fn with_ttl(mut self, cap: Capability, ttl: Duration) -> Self {
        self.per_capability_ttl_ms.insert(
            cap.as_str().to_string(),
            u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        );
        self
    }
}

/// Accounting window of a request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindow {
    /// Fixed-length windows aligned to the moment the budget was created.
    Rolling(Duration),
    /// Calendar days; the budget resets at midnight UTC.
    UtcDay,
}

/// A request budget for one connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Maximum number of calls within a single window.
    pub limit: u64,
    /// Remaining-call count at or below which a warning is emitted.
    pub warn_remaining: u64,
    /// Accounting window.
    pub window: QuotaWindow,
}

impl Default for QuotaConfig {
    /// The site feed's session budget: 50 calls per UTC day, warning from the 45th.
    fn default() -> Self {
        Self {
            limit: 50,
            warn_remaining: 5,
            window: QuotaWindow::UtcDay,
        }
    }
}

/// Snapshot of a quota budget at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaState {
    /// Configured maximum calls per window.
    pub limit: u64,
    /// Remaining calls in the current window.
    pub remaining: u64,
    /// Time remaining until the current window resets.
    pub reset_in: Duration,
}

impl QuotaState {
    /// Whether the remaining budget is at or below `warn_remaining`.
    #[must_use]
    pub const fn is_low(&self, warn_remaining: u64) -> bool {
        self.remaining <= warn_remaining
    }
}

/// Credentials and endpoint for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key or token.
    pub credential: Option<String>,
    /// Base endpoint override.
    pub base_url: Option<String>,
}

/// Global configuration for the `Gridfeed` orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridfeedConfig {
    /// Timeout for individual connector calls.
    pub provider_timeout: Duration,
    /// Optional overall deadline for one aggregation's fan-out.
    ///
    /// Capabilities still pending when it fires are synthesized.
    pub request_timeout: Option<Duration>,
    /// Skip every connector and synthesize all data.
    pub force_synthetic: bool,
    /// Per-provider credentials and endpoints.
    pub providers: BTreeMap<Capability, ProviderSettings>,
    /// Result cache TTLs.
    pub cache: CacheConfig,
    /// Decimal places kept from coordinates when deriving cache keys.
    pub location_precision: u8,
}

impl Default for GridfeedConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(10),
            request_timeout: None,
            force_synthetic: false,
            providers: BTreeMap::new(),
            cache: CacheConfig::default(),
            location_precision: 2,
        }
    }
}

const CREDENTIAL_VARS: [(Capability, &str, &str); 4] = [
    (Capability::Market, "ENTSOE_API_KEY", "ENTSOE_BASE_URL"),
    (
        Capability::Carbon,
        "ELECTRICITYMAP_API_KEY",
        "ELECTRICITYMAP_BASE_URL",
    ),
    (
        Capability::Weather,
        "OPENWEATHER_API_KEY",
        "OPENWEATHER_BASE_URL",
    ),
    (Capability::Sites, "REBASE_API_KEY", "REBASE_BASE_URL"),
];

impl GridfeedConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// See [`GridfeedConfig::from_lookup`].
    pub fn from_env() -> Result<Self, GridfeedError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Recognized keys: `<PROVIDER>_API_KEY` and `<PROVIDER>_BASE_URL` for
    /// `ENTSOE`, `ELECTRICITYMAP`, `OPENWEATHER`, and `REBASE`;
    /// `GRIDFEED_FORCE_SYNTHETIC`; `GRIDFEED_PROVIDER_TIMEOUT_MS`;
    /// `GRIDFEED_REQUEST_TIMEOUT_MS`; `GRIDFEED_LOCATION_PRECISION`; and
    /// `GRIDFEED_TTL_<MARKET|CARBON|WEATHER|SITES>_SECS`. Empty values are
    /// treated as absent.
    ///
    /// # Errors
    /// Returns `Config` if a numeric or boolean value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GridfeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        for (cap, key_var, url_var) in CREDENTIAL_VARS {
            let settings = ProviderSettings {
                credential: get(key_var),
                base_url: get(url_var),
            };
            if settings != ProviderSettings::default() {
                cfg.providers.insert(cap, settings);
            }
        }

        if let Some(v) = get("GRIDFEED_FORCE_SYNTHETIC") {
            cfg.force_synthetic = parse_bool("GRIDFEED_FORCE_SYNTHETIC", &v)?;
        }
        if let Some(v) = get("GRIDFEED_PROVIDER_TIMEOUT_MS") {
            cfg.provider_timeout =
                Duration::from_millis(parse_num("GRIDFEED_PROVIDER_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("GRIDFEED_REQUEST_TIMEOUT_MS") {
            cfg.request_timeout = Some(Duration::from_millis(parse_num(
                "GRIDFEED_REQUEST_TIMEOUT_MS",
                &v,
            )?));
        }
        if let Some(v) = get("GRIDFEED_LOCATION_PRECISION") {
            let p = parse_num("GRIDFEED_LOCATION_PRECISION", &v)?;
            cfg.location_precision = u8::try_from(p)
                .ok()
                .filter(|p| *p <= 6)
                .ok_or_else(|| {
                    GridfeedError::Config(format!("GRIDFEED_LOCATION_PRECISION out of range: {p}"))
                })?;
        }
        for cap in Capability::ALL {
            let var = format!("GRIDFEED_TTL_{}_SECS", cap.as_str().to_ascii_uppercase());
            if let Some(v) = get(&var) {
                let secs = parse_num(&var, &v)?;
                cfg.cache = cfg.cache.with_ttl(cap, Duration::from_secs(secs));
            }
        }
        Ok(cfg)
    }

    /// Settings for one provider (empty when unconfigured).
    #[must_use]
    pub fn provider(&self, cap: Capability) -> ProviderSettings {
        self.providers.get(&cap).cloned().unwrap_or_default()
    }

    /// Whether a credential is configured, per capability.
    #[must_use]
    pub fn credential_status(&self) -> BTreeMap<Capability, bool> {
        Capability::ALL
            .into_iter()
            .map(|cap| {
                let present = self
                    .providers
                    .get(&cap)
                    .and_then(|s| s.credential.as_ref())
                    .is_some();
                (cap, present)
            })
            .collect()
    }
}

fn parse_num(key: &str, raw: &str) -> Result<u64, GridfeedError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| GridfeedError::Config(format!("{key}: {e}")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, GridfeedError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GridfeedError::Config(format!(
            "{key}: expected a boolean, got {other:?}"
        ))),
    }
}
