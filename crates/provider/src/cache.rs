//! TTL-keyed cache for provider fetches.
//!
//! Keys are (endpoint, symbol, normalized-and-sorted params). Only
//! successful fetches are stored; callers re-raise fetch errors unchanged.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use wheel_scan_core::config::CacheConfig;

/// Normalized cache key. Params are sorted so equivalent queries collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: String,
    pub symbol: String,
    pub params: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(endpoint: &str, symbol: &str, params: &[(String, String)]) -> Self {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();
        let params = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        Self {
            endpoint: endpoint.to_string(),
            symbol: symbol.to_uppercase(),
            params,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub cached_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    /// Fresh while age is strictly below the TTL.
    #[must_use]
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = (now - self.cached_at).num_seconds();
        age >= 0 && (age as u64) < self.ttl_seconds
    }
}

/// Hit/miss counters surfaced on the run result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Shared TTL cache. The only resource mutated concurrently during a run.
pub struct CacheStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    config: CacheConfig,
}

impl CacheStore {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            config,
        }
    }

    /// TTL tier by endpoint family; unrecognized endpoints get the default.
    #[must_use]
    pub fn ttl_for_endpoint(&self, endpoint: &str) -> u64 {
        if endpoint.contains("iv_rank") {
            self.config.iv_rank_ttl_secs
        } else if endpoint.contains("calendar") || endpoint.contains("earnings") {
            self.config.calendar_ttl_secs
        } else if endpoint.contains("quote")
            || endpoint.contains("strike")
            || endpoint.contains("chain")
            || endpoint.contains("candle")
        {
            self.config.quote_ttl_secs
        } else {
            self.config.default_ttl_secs
        }
    }

    /// Returns the cached value if present and fresh; counts a hit or miss.
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_fresh_at(Utc::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores a successful fetch, overwriting any stale entry.
    pub async fn put(&self, key: CacheKey, value: serde_json::Value) {
        let ttl_seconds = self.ttl_for_endpoint(&key.endpoint);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                value,
                cached_at: Utc::now(),
                ttl_seconds,
            },
        );
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
