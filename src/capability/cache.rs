use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};
use url::Url;

use super::{capabilities_url, CapabilityDocument, CapabilityFetcher, ProxyRewrite};
use crate::{config::CacheConfig, CatalogError};

#[derive(Debug, Clone)]
struct CacheEntry {
    document: Arc<CapabilityDocument>,
    stored_at: Instant,
    // insertion sequence, used to evict oldest first
    seq: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Remote fetch attempts, successful or not.
    pub fetches: u64,
    pub hits: u64,
    pub entries: usize,
}

/// URL-keyed store of parsed capability documents.
///
/// Only successfully parsed documents are stored, so a failed fetch is retried on the next
/// call. The cache never coalesces concurrent misses itself; the catalog's per-endpoint
/// single-flight guard does that for population.
pub struct CapabilityCache {
    fetcher: Arc<dyn CapabilityFetcher>,
    settings: CacheConfig,
    proxy: Option<ProxyRewrite>,
    wms_version: String,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    next_seq: AtomicU64,
    fetches: AtomicU64,
    hits: AtomicU64,
}

impl std::fmt::Debug for CapabilityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityCache")
            .field("settings", &self.settings)
            .field("proxy", &self.proxy)
            .field("stats", &self.stats())
            .finish()
    }
}

impl CapabilityCache {
    pub fn new(
        fetcher: Arc<dyn CapabilityFetcher>,
        settings: CacheConfig,
        proxy: Option<ProxyRewrite>,
        wms_version: &str,
    ) -> CapabilityCache {
        CapabilityCache {
            fetcher,
            settings,
            proxy,
            wms_version: wms_version.to_string(),
            entries: Mutex::new(BTreeMap::new()),
            next_seq: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// The URL actually requested for an endpoint, which is also its cache key.
    pub fn request_url(&self, endpoint: &Url) -> Url {
        let request = capabilities_url(endpoint, &self.wms_version);
        match &self.proxy {
            Some(proxy) => proxy.apply(&request),
            None => request,
        }
    }

    /// Return the capability document of `endpoint`, fetching it when it is not cached, has
    /// expired, or `force_refresh` is set.
    #[tracing::instrument(skip(self), fields(endpoint = %endpoint))]
    pub fn get(
        &self,
        endpoint: &Url,
        force_refresh: bool,
    ) -> Result<Arc<CapabilityDocument>, CatalogError> {
        let request = self.request_url(endpoint);
        let key = request.to_string();

        if force_refresh {
            if self.entries.lock().remove(&key).is_some() {
                tracing::debug!("[CapabilityCache::get] evicted {key} for forced refresh");
            }
        } else if self.settings.enabled {
            if let Some(document) = self.lookup(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(document);
            }
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        let body = self.fetcher.fetch(&request)?;
        let document = Arc::new(CapabilityDocument::parse(&body)?);
        tracing::info!(
            "[CapabilityCache::get] fetched {} ({} layers)",
            key,
            document.leaf_count()
        );

        if self.settings.enabled {
            self.store(key, document.clone());
        }
        Ok(document)
    }

    fn lookup(&self, key: &str) -> Option<Arc<CapabilityDocument>> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if let Some(ttl) = self.settings.ttl() {
            if entry.stored_at.elapsed() >= ttl {
                tracing::debug!("[CapabilityCache::lookup] {key} expired");
                entries.remove(key);
                return None;
            }
        }
        Some(entry.document.clone())
    }

    fn store(&self, key: String, document: Arc<CapabilityDocument>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            CacheEntry {
                document,
                stored_at: Instant::now(),
                seq,
            },
        );
        if let Some(max) = self.settings.max_entries {
            while entries.len() > max {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.seq)
                    .map(|(k, _)| k.clone())
                else {
                    break;
                };
                tracing::debug!("[CapabilityCache::store] evicting {oldest}");
                entries.remove(&oldest);
            }
        }
    }

    pub fn invalidate(&self, endpoint: &Url) -> bool {
        let key = self.request_url(endpoint).to_string();
        self.entries.lock().remove(&key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            entries: self.entries.lock().len(),
        }
    }
}
