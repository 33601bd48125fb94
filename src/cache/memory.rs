//! In-memory cache implementation using moka
//!
//! Entries expire after the cache-wide time-to-live set at construction.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// JSON-serialized cache value
#[derive(Clone)]
struct CacheEntry {
    data: Arc<String>,
}

impl CacheEntry {
    fn new<T: Serialize>(value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        Ok(Self {
            data: Arc::new(json),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.data).context("Failed to deserialize cache value")
    }
}

/// In-memory cache using moka
pub struct MemoryCache {
    cache: Cache<String, CacheEntry>,
    ttl: Duration,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entry_count", &self.cache.entry_count())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_capacity_and_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache, ttl }
    }
}

#[async_trait]
impl CacheLayer for MemoryCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.cache.get(key).await {
            Some(entry) => Ok(Some(entry.deserialize()?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry::new(value)?;
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Summary {
        id: i64,
        username: Option<String>,
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        let value = Summary {
            id: 1,
            username: Some("herodotus".to_string()),
        };

        cache.set("profile:1", &value).await.unwrap();
        let loaded: Option<Summary> = cache.get("profile:1").await.unwrap();
        assert_eq!(loaded, Some(value));

        cache.delete("profile:1").await.unwrap();
        let loaded: Option<Summary> = cache.get("profile:1").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryCache::with_capacity_and_ttl(100, Duration::from_millis(50));
        cache.set("k", &1_i64).await.unwrap();
        assert_eq!(cache.get::<i64>("k").await.unwrap(), Some(1));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.get::<i64>("k").await.unwrap().is_none());
    }
}
