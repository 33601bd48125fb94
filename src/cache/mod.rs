//! Cache layer
//!
//! Process-local caching of hot read models (profile summaries). Values are
//! stored as JSON so one cache can hold any serializable type.
//!
//! ```rust,ignore
//! let cache = create_cache(&config.cache);
//! cache.set(&profile_key(7), &summary).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// Generic methods keep it from being object safe, so services hold the
/// concrete `MemoryCache` behind an `Arc`.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value until the cache's time-to-live runs out
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Cache key for a profile summary
pub fn profile_key(id: i64) -> String {
    format!("profile:{}", id)
}

/// Build the cache from configuration
pub fn create_cache(config: &CacheConfig) -> Arc<MemoryCache> {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}
