//! Response cache shared by the feed clients.
//!
//! Decoded payloads are keyed by request URL and expire `ttl` after they
//! were stored. A zero TTL turns caching off entirely.

use std::time::Duration;

use moka::future::Cache;
use serde_json::Value;

/// One entry per endpoint is all the clients ever need.
const MAX_ENTRIES: u64 = 64;

#[derive(Debug, Clone)]
pub struct ResponseCache {
    ttl: Duration,
    inner: Option<Cache<String, Value>>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let inner = (!ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build()
        });
        Self { ttl, inner }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn get(&self, url: &str) -> Option<Value> {
        let hit = self.inner.as_ref()?.get(url).await;
        if hit.is_some() {
            tracing::debug!(url, "response served from cache");
        }
        hit
    }

    pub async fn insert(&self, url: &str, payload: Value) {
        if let Some(cache) = &self.inner {
            cache.insert(url.to_owned(), payload).await;
        }
    }

    pub async fn invalidate(&self, url: &str) {
        if let Some(cache) = &self.inner {
            cache.invalidate(url).await;
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const URL: &str = "https://api.example.com/parkingbays";
    const OTHER: &str = "https://api.example.com/parkingzones";

    #[tokio::test]
    async fn returns_value_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert(URL, json!([1, 2])).await;
        assert_eq!(cache.get(URL).await, Some(json!([1, 2])));
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(50));
        cache.insert(URL, json!([1])).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(URL).await, None);
    }

    #[tokio::test]
    async fn insert_replaces_previous_value() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert(URL, json!([1])).await;
        cache.insert(URL, json!([2])).await;
        assert_eq!(cache.get(URL).await, Some(json!([2])));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert(URL, json!([1])).await;
        cache.insert(OTHER, json!([2])).await;
        cache.invalidate(URL).await;
        assert_eq!(cache.get(URL).await, None);
        assert_eq!(cache.get(OTHER).await, Some(json!([2])));
        cache.clear();
        assert_eq!(cache.get(OTHER).await, None);
    }

    #[tokio::test]
    async fn zero_ttl_disables_caching() {
        let cache = ResponseCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.insert(URL, json!([1])).await;
        assert_eq!(cache.get(URL).await, None);
    }
}
