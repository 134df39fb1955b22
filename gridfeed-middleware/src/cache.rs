//! TTL result cache.
//!
//! The aggregator owns one [`ResultCache`] and is its only writer. Entries are
//! never collected in the background: an entry whose age has reached its TTL is
//! dropped by the `get` that observes it, and `put` overwrites in place.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridfeed_types::{CacheConfig, Capability, PowerBreakdown, ProviderResult, QuerySignature, Site};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Key/value store with per-entry time-to-live.
#[async_trait]
pub trait CacheStore<K, V>: Send + Sync {
    /// The value for `key`, or `None` if absent or `now - inserted_at >= ttl`.
    async fn get(&self, key: &K) -> Option<V>;

    /// Insert or replace the value for `key`.
    async fn put(&self, key: K, value: V, ttl: Duration);

    /// Number of stored entries, expired ones included.
    async fn len(&self) -> usize;

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) < self.ttl
    }
}

/// In-memory [`CacheStore`] guarded by an async mutex.
///
/// Uses tokio's clock, so paused-time tests can drive expiry.
pub struct TtlStore<K, V> {
    inner: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> Default for TtlStore<K, V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlStore<K, V> {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for TtlStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        match guard.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: K, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            inserted_at: Instant::now(),
            ttl,
        };
        self.inner.lock().await.insert(key, entry);
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

type Store<K, V> = Arc<dyn CacheStore<K, V>>;

/// Per-capability caches of real provider results.
///
/// A capability whose configured TTL is zero gets no store; reads miss and
/// writes are dropped. Synthetic results are never stored.
pub struct ResultCache {
    results: HashMap<Capability, (Store<QuerySignature, Arc<ProviderResult>>, Duration)>,
    breakdowns: Option<(Store<QuerySignature, Arc<PowerBreakdown>>, Duration)>,
    sites: Option<(Store<String, Arc<Vec<Site>>>, Duration)>,
}

impl ResultCache {
    /// Build stores according to `cfg`.
    #[must_use]
    pub fn new(cfg: &CacheConfig) -> Self {
        let results = [Capability::Market, Capability::Carbon, Capability::Weather]
            .into_iter()
            .filter_map(|cap| {
                let ttl = cfg.ttl_for(cap)?;
                let store: Store<QuerySignature, Arc<ProviderResult>> = Arc::new(TtlStore::new());
                Some((cap, (store, ttl)))
            })
            .collect();
        let breakdowns = cfg.ttl_for(Capability::Carbon).map(|ttl| {
            let store: Store<QuerySignature, Arc<PowerBreakdown>> = Arc::new(TtlStore::new());
            (store, ttl)
        });
        let sites = cfg.ttl_for(Capability::Sites).map(|ttl| {
            let store: Store<String, Arc<Vec<Site>>> = Arc::new(TtlStore::new());
            (store, ttl)
        });
        Self {
            results,
            breakdowns,
            sites,
        }
    }

    /// Whether results for `cap` are cached at all.
    #[must_use]
    pub fn is_enabled(&self, cap: Capability) -> bool {
        match cap {
            Capability::Sites => self.sites.is_some(),
            other => self.results.contains_key(&other),
        }
    }

    /// Cached result for `signature`, if fresh.
    pub async fn get(
        &self,
        cap: Capability,
        signature: &QuerySignature,
    ) -> Option<Arc<ProviderResult>> {
        let (store, _) = self.results.get(&cap)?;
        store.get(signature).await
    }

    /// Store a real result under its own signature with the capability's TTL.
    ///
    /// Returns `false` when the result was not stored (synthetic, or caching disabled).
    pub async fn put(&self, cap: Capability, result: Arc<ProviderResult>) -> bool {
        if !result.is_real() {
            return false;
        }
        let Some((store, ttl)) = self.results.get(&cap) else {
            return false;
        };
        store.put(result.signature.clone(), result, *ttl).await;
        true
    }

    /// Cached power breakdown for a carbon query signature.
    pub async fn get_breakdown(&self, signature: &QuerySignature) -> Option<Arc<PowerBreakdown>> {
        let (store, _) = self.breakdowns.as_ref()?;
        store.get(signature).await
    }

    /// Store a real power breakdown.
    pub async fn put_breakdown(&self, signature: QuerySignature, breakdown: Arc<PowerBreakdown>) {
        if let Some((store, ttl)) = &self.breakdowns {
            store.put(signature, breakdown, *ttl).await;
        }
    }

    /// Cached site list for a provider.
    pub async fn get_sites(&self, provider: &str) -> Option<Arc<Vec<Site>>> {
        let (store, _) = self.sites.as_ref()?;
        store.get(&provider.to_string()).await
    }

    /// Store a site list fetched from `provider`.
    pub async fn put_sites(&self, provider: &str, sites: Arc<Vec<Site>>) {
        if let Some((store, ttl)) = &self.sites {
            store.put(provider.to_string(), sites, *ttl).await;
        }
    }
}
