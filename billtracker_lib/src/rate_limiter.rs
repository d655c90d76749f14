//! Minimum-spacing rate limiter for LegiScan requests.
//!
//! LegiScan expects clients to pace themselves and also meters a monthly
//! query budget, so spacing is enforced locally before each request and
//! every permitted request is counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Default spacing between consecutive upstream requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Serializes callers so that permitted calls are at least `min_interval` apart.
///
/// The last-call instant is held behind a tokio `Mutex` for the whole wait,
/// so concurrent callers sharing one limiter (via `Arc`) queue up and are
/// spaced rather than released together.
pub struct RateLimiter {
    last_call: Mutex<Option<Instant>>,
    min_interval: Duration,
    queries: AtomicU64,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_interval,
            queries: AtomicU64::new(0),
        }
    }

    /// Wait until the minimum interval has passed since the previous permitted
    /// call, then record this call and bump the query counter. Never fails.
    pub async fn throttle(&self) -> u64 {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if Instant::now() < ready_at {
                sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
        self.queries.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Number of calls permitted so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_call_is_immediate() {
        tokio::time::pause();
        let limiter = RateLimiter::default();
        let start = Instant::now();
        limiter.throttle().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.query_count(), 1);
    }

    #[tokio::test]
    async fn consecutive_calls_are_spaced() {
        tokio::time::pause();
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();
        for _ in 0..5 {
            limiter.throttle().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert_eq!(limiter.query_count(), 5);
    }

    #[tokio::test]
    async fn real_clock_spacing_holds() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        let start = std::time::Instant::now();
        for _ in 0..4 {
            limiter.throttle().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn no_wait_after_interval_already_elapsed() {
        tokio::time::pause();
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.throttle().await;
        tokio::time::advance(Duration::from_millis(250)).await;
        let before = Instant::now();
        limiter.throttle().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn shared_limiter_spaces_concurrent_callers() {
        tokio::time::pause();
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.throttle().await }));
        }
        let mut ordinals = Vec::new();
        for handle in handles {
            ordinals.push(handle.await.unwrap());
        }
        ordinals.sort_unstable();

        assert_eq!(ordinals, vec![1, 2, 3]);
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(limiter.query_count(), 3);
    }
}
