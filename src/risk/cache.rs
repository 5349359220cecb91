//! TTL report cache.
//!
//! Entries live for a fixed time from insertion and the oldest-inserted entry
//! is evicted once capacity is reached. Expired entries are dropped lazily on
//! read or by [`ReportCache::purge_expired`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default maximum number of entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Cache key derived from an analysis summary.
///
/// Two summaries with the same rounded score and issue count share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a key from the overall score (two decimals) and the issue count.
    pub fn from_summary(overall_score: f64, issue_count: usize) -> Self {
        Self(format!("{overall_score:.2}:{issue_count}"))
    }

    /// Key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached value with its insertion time.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from a live entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Entries dropped because their TTL ran out.
    pub expirations: u64,
    /// Current number of entries.
    pub size: usize,
}

impl CacheStats {
    /// Hit ratio in [0, 1]; 0 when nothing was looked up.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<Fingerprint, CacheEntry<V>>,
    order: VecDeque<Fingerprint>,
    stats: CacheStats,
}

impl<V> Inner<V> {
    fn remove(&mut self, key: &Fingerprint) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry)
    }
}

/// Thread-safe TTL cache keyed by [`Fingerprint`].
#[derive(Debug)]
pub struct ReportCache<V> {
    inner: Mutex<Inner<V>>,
    ttl: Duration,
    capacity: usize,
}

impl<V: Clone> Default for ReportCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }
}

impl<V: Clone> ReportCache<V> {
    /// Create a cache. A capacity of zero stores nothing.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { entries: HashMap::new(), order: VecDeque::new(), stats: CacheStats::default() }),
            ttl,
            capacity,
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a live entry. An expired entry is removed and counts as a miss.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let mut inner = self.inner.lock();
        let lookup = inner
            .entries
            .get(key)
            .map(|entry| (entry.inserted_at.elapsed() < self.ttl).then(|| entry.value.clone()));

        match lookup {
            Some(Some(value)) => {
                inner.stats.hits += 1;
                Some(value)
            }
            Some(None) => {
                inner.remove(key);
                inner.stats.expirations += 1;
                inner.stats.misses += 1;
                tracing::trace!(key = %key, "Cache entry expired");
                None
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    /// Store a value, evicting the oldest entries if the cache is full.
    pub fn insert(&self, key: Fingerprint, value: V) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.lock();
        inner.remove(&key);

        while inner.entries.len() >= self.capacity {
            let Some(oldest) = inner.order.pop_front() else { break };
            inner.entries.remove(&oldest);
            inner.stats.evictions += 1;
            tracing::trace!(key = %oldest, "Evicted cache entry");
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, CacheEntry { value, inserted_at: Instant::now() });
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let ttl = self.ttl;

        let expired: Vec<Fingerprint> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.remove(key);
        }
        inner.stats.expirations += expired.len() as u64;
        expired.len()
    }

    /// Remove all entries. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats { size: inner.entries.len(), ..inner.stats }
    }
}
