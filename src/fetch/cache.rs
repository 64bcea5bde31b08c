//! Time-bounded response cache keyed by request URL.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Lifetime class requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDuration {
    /// Frequently changing feeds such as the mod catalog.
    Short,
    /// Slow-moving release feeds.
    Long,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// URL → body map with lazy expiry.
///
/// There is no background sweeper. Every lookup first drops all expired
/// entries, then probes for the requested key.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    short_ttl: Duration,
    long_ttl: Duration,
}

impl ResponseCache {
    #[must_use]
    pub fn new(short_ttl: Duration, long_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            short_ttl,
            long_ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self, duration: CacheDuration) -> Duration {
        match duration {
            CacheDuration::Short => self.short_ttl,
            CacheDuration::Long => self.long_ttl,
        }
    }

    /// Sweep expired entries and return the cached body for `url`, if any.
    pub fn get(&self, url: &str) -> Option<String> {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.entries.get(url).map(|entry| entry.content.clone())
    }

    pub fn insert(&self, url: &str, content: String, duration: CacheDuration) {
        let expires_at = Instant::now() + self.ttl(duration);
        self.insert_entry(url, CacheEntry {
            content,
            expires_at,
        });
    }

    /// Store an entry with an explicit expiry instant.
    pub fn insert_entry(&self, url: &str, entry: CacheEntry) {
        self.entries.insert(url.to_string(), entry);
    }

    pub fn invalidate(&self, url: &str) -> bool {
        self.entries.remove(url).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
