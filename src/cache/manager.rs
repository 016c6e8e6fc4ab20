//! In-memory TTL cache for forecast payloads
//!
//! Entries are keyed by the query fingerprint and owned exclusively by the
//! cache: created on miss, read-only afterwards, and dropped once expired.
//! The expiration check and the read happen under a single lock acquisition,
//! so a lookup never returns a payload stored under different query options
//! or past its TTL.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::data::{FetchError, ForecastPayload, ForecastQuery};

/// A cached payload with its expiration
#[derive(Debug)]
struct CacheEntry {
    /// The decoded forecast
    payload: ForecastPayload,
    /// Instant after which the entry is stale
    expires_at: DateTime<Utc>,
}

/// In-memory forecast cache keyed by query fingerprint
///
/// The cache is TTL-agnostic: callers supply the duration on every store, so
/// one cache instance can serve widgets with different cache periods.
#[derive(Debug, Default)]
pub struct ForecastCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ForecastCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live payload for a key, if one exists
    ///
    /// Expired entries are removed on read and never returned.
    pub fn get(&self, key: &str) -> Option<ForecastPayload> {
        let mut entries = self.lock_entries();
        match entries.get(key) {
            Some(entry) if Utc::now() <= entry.expires_at => Some(entry.payload.clone()),
            Some(_) => {
                debug!(key, "Dropping expired forecast cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a payload under a key with the given time-to-live
    pub fn put(&self, key: String, payload: ForecastPayload, ttl: Duration) {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64);
        self.lock_entries()
            .insert(key, CacheEntry { payload, expires_at });
    }

    /// Returns the cached forecast for a query, fetching on miss
    ///
    /// On a live cache hit the fetch function is never invoked. On a miss the
    /// fetch runs outside the cache lock; a successful result is stored with
    /// `now + ttl` and returned, a failure is propagated without being
    /// cached. Two callers racing on the same absent key may both fetch; the
    /// last writer wins.
    ///
    /// # Arguments
    /// * `query` - The forecast query; its fingerprint is the cache key
    /// * `ttl` - How long a freshly fetched payload stays live
    /// * `fetch` - Performs the remote call on a miss
    pub async fn get_or_fetch<F, Fut>(
        &self,
        query: &ForecastQuery,
        ttl: Duration,
        fetch: F,
    ) -> Result<ForecastPayload, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ForecastPayload, FetchError>>,
    {
        let key = query.fingerprint();

        if let Some(payload) = self.get(&key) {
            info!(key = %key, "Serving forecast from the cache");
            return Ok(payload);
        }

        info!(key = %key, "Requesting forecast from the API");
        let payload = fetch().await?;
        self.put(key, payload.clone(), ttl);
        Ok(payload)
    }

    /// Locks the entry map, recovering from a poisoned lock
    fn lock_entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Units;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal payload for cache tests
    const PAYLOAD: &str = r#"{
        "currently": {"time": 1720000000, "icon": "clear-day", "temperature": 20.0},
        "daily": {"data": []}
    }"#;

    fn payload() -> ForecastPayload {
        serde_json::from_str(PAYLOAD).expect("Failed to parse test payload")
    }

    fn query() -> ForecastQuery {
        ForecastQuery::new(49.2827, -123.1207, Units::Auto, "en")
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_skips_fetch() {
        let cache = ForecastCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_fetch(&query(), Duration::from_secs(300), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(payload())
                })
                .await;
            assert!(result.is_ok());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1, "Fetch should run once");
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let cache = ForecastCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_fetch(&query(), Duration::from_secs(0), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(payload())
                })
                .await;
            assert!(result.is_ok());
            // Let the zero-TTL entry lapse
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2, "Stale entry must refetch");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_not_cached() {
        let cache = ForecastCache::new();
        let calls = AtomicUsize::new(0);

        let first: Result<ForecastPayload, FetchError> = cache
            .get_or_fetch(&query(), Duration::from_secs(300), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Api {
                    status: 500,
                    message: "Unknown Error".to_string(),
                })
            })
            .await;
        assert!(first.is_err());

        let second = cache
            .get_or_fetch(&query(), Duration::from_secs(300), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(payload())
            })
            .await;
        assert!(second.is_ok());
        assert_eq!(
            calls.load(Ordering::SeqCst),
            2,
            "Failure must not satisfy the next lookup"
        );
    }

    #[tokio::test]
    async fn test_distinct_queries_do_not_share_entries() {
        let cache = ForecastCache::new();
        let calls = AtomicUsize::new(0);

        let other = ForecastQuery::new(51.5072, -0.1276, Units::Uk, "en");
        for q in [query(), other] {
            let result = cache
                .get_or_fetch(&q, Duration::from_secs(300), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(payload())
                })
                .await;
            assert!(result.is_ok());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2, "Each fingerprint fetches");
    }

    #[test]
    fn test_get_returns_none_for_missing_key() {
        let cache = ForecastCache::new();
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_put_then_get_roundtrip() {
        let cache = ForecastCache::new();
        cache.put("key".to_string(), payload(), Duration::from_secs(300));

        let cached = cache.get("key").expect("Entry should be live");
        assert_eq!(cached, payload());
    }
}
