//! # Expiring Cache
//!
//! Thread-safe wrapper around a [`crate::store::Store`] that adds
//! per-entry TTL and hit/miss counters. Expiry is computed from
//! [`std::time::Instant`] rather than a captured wall-clock timestamp, so
//! the cache is immune to system clock adjustments.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::byteview::ByteView;
use crate::store::{CacheValue, Lru, Lru2, Store};

impl CacheValue for CacheEntry {
    fn cache_len(&self) -> usize {
        self.value.len()
    }
}

#[derive(Clone)]
struct CacheEntry {
    value: ByteView,
    expire_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expire_at, Some(at) if now >= at)
    }
}

/// Which [`crate::store::Store`] implementation backs a [`Cache`].
/// Unrecognized values (when parsed from configuration strings) fall back
/// to `Lru`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Lru,
    Lru2,
}

impl From<&str> for StoreKind {
    fn from(value: &str) -> Self {
        match value {
            "lru2" => StoreKind::Lru2,
            _ => StoreKind::Lru,
        }
    }
}

/// Configures a [`Cache`]'s backing store.
#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub store_kind: StoreKind,
    pub max_bytes: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            store_kind: StoreKind::Lru,
            max_bytes: 8 << 20,
        }
    }
}

/// Point-in-time hit/miss counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

enum Backing {
    Lru(Lru<CacheEntry>),
    Lru2(Lru2<CacheEntry>),
}

impl Backing {
    fn new(options: &CacheOptions) -> Self {
        match options.store_kind {
            StoreKind::Lru => Backing::Lru(Lru::new(options.max_bytes, None)),
            StoreKind::Lru2 => Backing::Lru2(Lru2::new(options.max_bytes, None)),
        }
    }
}

impl Store<CacheEntry> for Backing {
    fn get(&mut self, key: &str) -> Option<CacheEntry> {
        match self {
            Backing::Lru(store) => store.get(key),
            Backing::Lru2(store) => store.get(key),
        }
    }

    fn add(&mut self, key: String, value: CacheEntry) {
        match self {
            Backing::Lru(store) => store.add(key, value),
            Backing::Lru2(store) => store.add(key, value),
        }
    }

    fn remove(&mut self, key: &str) {
        match self {
            Backing::Lru(store) => store.remove(key),
            Backing::Lru2(store) => store.remove(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backing::Lru(store) => store.len(),
            Backing::Lru2(store) => store.len(),
        }
    }

    fn bytes(&self) -> u64 {
        match self {
            Backing::Lru(store) => store.bytes(),
            Backing::Lru2(store) => store.bytes(),
        }
    }
}

/// Thread-safe, TTL-aware local cache. One instance backs each
/// [`crate::group::Group`]'s local tier.
pub struct Cache {
    store: Mutex<Backing>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl Cache {
    pub fn new(options: CacheOptions) -> Self {
        Cache {
            store: Mutex::new(Backing::new(&options)),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Looks up `key`. A present-but-expired entry counts as a miss and is
    /// evicted eagerly so its bytes are reclaimed immediately rather than
    /// waiting for capacity pressure.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut store = self.store.lock();
        let Some(entry) = store.get(key) else {
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if entry.is_expired(Instant::now()) {
            store.remove(key);
            self.miss_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        Some(entry.value)
    }

    /// Stores `value` under `key`. `ttl` of `None` or zero means no
    /// expiration.
    pub fn set(&self, key: impl Into<String>, value: ByteView, ttl: Option<Duration>) {
        let expire_at = ttl.filter(|d| !d.is_zero()).map(|d| Instant::now() + d);
        self.store
            .lock()
            .add(key.into(), CacheEntry { value, expire_at });
    }

    pub fn remove(&self, key: &str) {
        self.store.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bytes(&self) -> u64 {
        self.store.lock().bytes()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
