//! Sliding-window rate limiting
//!
//! Used for failed logins (per identifier) and for sending messages (per
//! sender). Each limiter tracks event timestamps per key and forgets those
//! older than its window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keyed sliding-window limiter
#[derive(Clone)]
pub struct RateLimiter {
    max_events: usize,
    window: Duration,
    events: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
}

impl RateLimiter {
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 5 failed attempts per 15 minutes
    pub fn for_logins() -> Self {
        Self::new(5, Duration::minutes(15))
    }

    /// 30 messages per minute
    pub fn for_messages() -> Self {
        Self::new(30, Duration::minutes(1))
    }

    fn normalize(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Whether `key` has used up its allowance in the current window
    pub async fn is_limited(&self, key: &str) -> bool {
        let mut events = self.events.write().await;
        let cutoff = Utc::now() - self.window;

        let entry = events.entry(Self::normalize(key)).or_default();
        entry.retain(|time| *time > cutoff);

        entry.len() >= self.max_events
    }

    /// Record one event for `key`
    pub async fn record(&self, key: &str) {
        let mut events = self.events.write().await;
        events
            .entry(Self::normalize(key))
            .or_default()
            .push(Utc::now());
    }

    /// Record an event unless `key` is limited; returns false when limited
    pub async fn try_acquire(&self, key: &str) -> bool {
        let mut events = self.events.write().await;
        let now = Utc::now();
        let cutoff = now - self.window;

        let entry = events.entry(Self::normalize(key)).or_default();
        entry.retain(|time| *time > cutoff);
        if entry.len() >= self.max_events {
            return false;
        }
        entry.push(now);
        true
    }

    /// Forget all events for `key` (e.g. after a successful login)
    pub async fn clear(&self, key: &str) {
        self.events.write().await.remove(&Self::normalize(key));
    }

    /// Drop expired timestamps and empty keys; run periodically
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.events.read().await.len()
    }
}
