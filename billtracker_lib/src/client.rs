//! Caching and rate-limiting wrapper around the LegiScan client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use legiscan_api::types::{BillDetail, BillText, MasterListEntry, Session};
use legiscan_api::{Client, Operation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheKey, CacheStats, CacheTtls, ResponseCache};
use crate::config::ClientConfig;
use crate::error::BillTrackerError;
use crate::rate_limiter::RateLimiter;

/// Master list plus whether its set of change hashes moved since the last fetch.
#[derive(Debug, Clone)]
pub struct MasterList {
    pub entries: Vec<MasterListEntry>,
    pub changed: bool,
}

/// API client wrapper that adds an in-memory TTL cache and request pacing.
///
/// Cache hits bypass the network entirely. Every live request first passes
/// through the rate limiter, whose counter doubles as the query budget
/// meter. Errors are not retried here.
pub struct CachedClient {
    inner: Client,
    cache: ResponseCache,
    limiter: Arc<RateLimiter>,
    ttls: CacheTtls,
}

impl CachedClient {
    /// Wraps an existing client with a fresh cache and default pacing.
    pub fn new(inner: Client, cache: ResponseCache) -> Self {
        Self {
            inner,
            cache,
            limiter: Arc::new(RateLimiter::default()),
            ttls: CacheTtls::default(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, BillTrackerError> {
        let inner = Client::with_options(&config.base_url, &config.api_key, config.timeout)?;
        Ok(Self::new(inner, ResponseCache::new())
            .with_min_interval(config.min_interval)
            .with_ttls(config.ttls))
    }

    /// Creates a cached client with a custom base URL. Used for testing.
    pub fn with_base_url(base_url: &str, api_key: &str) -> Result<Self, BillTrackerError> {
        Ok(Self::new(
            Client::with_base_url(base_url, api_key)?,
            ResponseCache::new(),
        ))
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    /// Replaces the limiter with a private one using `interval` spacing.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.limiter = Arc::new(RateLimiter::new(interval));
        self
    }

    /// Shares one limiter (and its query counter) across several clients.
    pub fn with_shared_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    fn cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = self.cache.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                self.cache.remove(key);
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: &CacheKey, value: &T, hash: Option<String>, ttl: Duration) {
        match serde_json::to_string(value) {
            Ok(json) => self.cache.put(key, json, hash, ttl),
            Err(e) => tracing::warn!("Not caching {}: {}", key, e),
        }
    }

    async fn live<T, F, Fut>(&self, op: Operation, f: F) -> Result<T, BillTrackerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, legiscan_api::Error>>,
    {
        let n = self.limiter.throttle().await;
        tracing::debug!("LegiScan query {}: {}", n, op);
        Ok(f().await?)
    }

    /// Sessions for a state, cached for the sessions TTL.
    pub async fn list_sessions(&self, state: &str) -> Result<Vec<Session>, BillTrackerError> {
        let key = CacheKey::new(Operation::GetSessionList.as_str()).param("state", state);
        if let Some(sessions) = self.cached::<Vec<Session>>(&key) {
            return Ok(sessions);
        }

        let sessions = self
            .live(Operation::GetSessionList, || self.inner.get_session_list(state))
            .await?;
        self.store(&key, &sessions, None, self.ttls.sessions);
        Ok(sessions)
    }

    /// The first regular, non-prior session in upstream order; otherwise the
    /// first session listed; `None` when the state has no sessions.
    pub async fn current_session(&self, state: &str) -> Result<Option<Session>, BillTrackerError> {
        let sessions = self.list_sessions(state).await?;
        Ok(pick_current_session(sessions))
    }

    /// Always fetches the master list live and compares its change hashes
    /// with the cached list for the same session.
    pub async fn master_list(&self, session_id: i64) -> Result<MasterList, BillTrackerError> {
        let key = CacheKey::new(Operation::GetMasterListRaw.as_str()).param("id", session_id);

        let entries = self
            .live(Operation::GetMasterListRaw, || {
                self.inner.get_master_list_raw(session_id)
            })
            .await?;

        let changed = match self.cached::<Vec<MasterListEntry>>(&key) {
            Some(previous) => hash_multiset(&previous) != hash_multiset(&entries),
            None => true,
        };

        if changed {
            self.store(&key, &entries, None, self.ttls.master_list);
            tracing::info!(
                "Master list updated for session {} ({} bills)",
                session_id,
                entries.len()
            );
        } else {
            tracing::info!("No changes in master list for session {}", session_id);
        }

        Ok(MasterList { entries, changed })
    }

    /// A bill's full record. With `expected_hash` matching the cached entry's
    /// hash, the cached record is returned without any upstream call.
    pub async fn bill_detail(
        &self,
        bill_id: i64,
        expected_hash: Option<&str>,
    ) -> Result<Option<BillDetail>, BillTrackerError> {
        let key = detail_key(bill_id);

        if let Some(hash) = expected_hash {
            if self.cache.is_fresh(&key, hash) {
                if let Some(bill) = self.cached::<BillDetail>(&key) {
                    tracing::debug!("Bill {} unchanged, using cache", bill_id);
                    return Ok(Some(bill));
                }
            }
        }

        let bill = self
            .live(Operation::GetBill, || self.inner.get_bill(bill_id))
            .await?;
        if let Some(ref bill) = bill {
            let hash = Some(bill.change_hash.clone()).filter(|h| !h.is_empty());
            self.store(&key, bill, hash, self.ttls.bill_detail);
        }
        Ok(bill)
    }

    /// A text document, cached for the text TTL without hash checks.
    pub async fn bill_text(&self, doc_id: i64) -> Result<BillText, BillTrackerError> {
        let key = CacheKey::new(Operation::GetBillText.as_str()).param("id", doc_id);
        if let Some(text) = self.cached::<BillText>(&key) {
            return Ok(text);
        }

        let text = self
            .live(Operation::GetBillText, || self.inner.get_bill_text(doc_id))
            .await?;
        self.store(&key, &text, None, self.ttls.bill_text);
        Ok(text)
    }

    /// Whether the cached detail for `bill_id` was stored with `hash` and is still live.
    pub fn is_detail_fresh(&self, bill_id: i64, hash: &str) -> bool {
        self.cache.is_fresh(&detail_key(bill_id), hash)
    }

    /// Upstream queries issued by this client's limiter so far.
    pub fn query_count(&self) -> u64 {
        self.limiter.query_count()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Removes all entries from the cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn detail_key(bill_id: i64) -> CacheKey {
    CacheKey::new(Operation::GetBill.as_str()).param("id", bill_id)
}

pub(crate) fn pick_current_session(mut sessions: Vec<Session>) -> Option<Session> {
    let regular = sessions.iter().position(|s| !s.prior && !s.special);
    match regular {
        Some(i) => Some(sessions.swap_remove(i)),
        None => sessions.into_iter().next(),
    }
}

fn hash_multiset(entries: &[MasterListEntry]) -> Vec<&str> {
    let mut hashes: Vec<&str> = entries.iter().map(|e| e.change_hash.as_str()).collect();
    hashes.sort_unstable();
    hashes
}
