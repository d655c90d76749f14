//! In-memory TTL cache backed by `DashMap` for concurrent access.
//!
//! Entries optionally carry the upstream content hash they were fetched
//! with, so callers can decide "unchanged, no refetch needed" by hash
//! equality alone.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

/// A single cached payload with its optional hash and expiration time.
struct CacheEntry {
    value: String,
    hash: Option<String>,
    created_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Deterministic key for one (operation, parameters) request.
///
/// Parameters are kept sorted by name, so two keys built with the same
/// parameters in a different order compare and render identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.operation)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Time-to-live per upstream operation.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub sessions: Duration,
    pub master_list: Duration,
    pub bill_detail: Duration,
    pub bill_text: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            sessions: Duration::from_secs(24 * 60 * 60),
            master_list: Duration::from_secs(60 * 60),
            bill_detail: Duration::from_secs(4 * 60 * 60),
            bill_text: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Occupancy and hit statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from cache, or `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} hits / {} misses ({:.1}% hit rate)",
            self.size,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}

/// Thread-safe in-memory response cache with per-entry expiration.
///
/// Payloads are stored as serialized JSON strings. Expired entries are
/// lazily evicted on the next lookup for that key. The cache never fails;
/// a miss just means the caller fetches live.
#[derive(Default)]
pub struct ResponseCache {
    store: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached payload for `key`, or `None` if missing or expired.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let key = key.to_string();
        let now = Instant::now();
        let Some(entry) = self.store.get(&key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if entry.is_expired(now) {
            drop(entry);
            self.evict_stale(&key, now);
            self.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Cache entry expired for {}", key);
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Cache hit for {} (age {}s)",
            key,
            now.duration_since(entry.created_at).as_secs()
        );
        Some(entry.value.clone())
    }

    /// Inserts or overwrites an entry that expires `ttl` from now.
    pub fn put(&self, key: &CacheKey, value: String, hash: Option<String>, ttl: Duration) {
        let now = Instant::now();
        self.store.insert(
            key.to_string(),
            CacheEntry {
                value,
                hash,
                created_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// True only if a live entry exists for `key` and its stored hash equals `candidate`.
    ///
    /// Does not count as a lookup for hit statistics.
    pub fn is_fresh(&self, key: &CacheKey, candidate: &str) -> bool {
        let now = Instant::now();
        match self.store.get(&key.to_string()) {
            Some(entry) => {
                !entry.is_expired(now) && entry.hash.as_deref() == Some(candidate)
            }
            None => false,
        }
    }

    /// Removes `key` only if the entry currently stored is still expired, so a
    /// `put` racing with a lookup is never discarded.
    fn evict_stale(&self, key: &str, now: Instant) -> bool {
        self.store.remove_if(key, |_, entry| entry.is_expired(now)).is_some()
    }

    /// Drops an entry if present.
    pub fn remove(&self, key: &CacheKey) {
        self.store.remove(&key.to_string());
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.store.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Removes all entries from the cache. Hit counters are kept.
    pub fn clear(&self) {
        self.store.clear();
    }
}
