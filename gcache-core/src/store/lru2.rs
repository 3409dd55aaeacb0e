//! # Two-Queue LRU Store
//!
//! Admission policy: a key seen once lives in `history`; only a second
//! touch promotes it into `main`. This keeps a single scan over cold keys
//! from displacing the warm working set.

use super::{lru::Lru, CacheValue, Store};

/// Two-queue LRU: a `history` admission queue and a `main` queue reached
/// only by a second touch. Only `main` fires the eviction callback;
/// `history` evictions are silent.
pub struct Lru2<V: CacheValue> {
    main: Lru<V>,
    history: Lru<V>,
}

impl<V: CacheValue> Lru2<V> {
    /// Splits `max_bytes` into a history budget (`max(1, max_bytes / 4)`)
    /// and a main budget (the remainder); `0` means unbounded for both.
    pub fn new(max_bytes: u64, on_evicted: Option<Box<dyn FnMut(&str, &V) + Send>>) -> Self {
        let (history_max, main_max) = if max_bytes > 0 {
            let history_max = (max_bytes / 4).max(1);
            (history_max, max_bytes - history_max)
        } else {
            (0, 0)
        };
        Lru2 {
            main: Lru::new(main_max, on_evicted),
            history: Lru::new(history_max, None),
        }
    }
}

impl<V: CacheValue> Store<V> for Lru2<V> {
    fn get(&mut self, key: &str) -> Option<V> {
        if let Some(value) = self.main.get(key) {
            return Some(value);
        }
        if let Some(value) = self.history.remove_silent(key) {
            self.main.add(key.to_string(), value.clone());
            return Some(value);
        }
        None
    }

    fn add(&mut self, key: String, value: V) {
        if self.main.contains(&key) {
            self.main.add(key, value);
            return;
        }
        if self.history.contains(&key) {
            self.history.remove_silent(&key);
            self.main.add(key, value);
            return;
        }
        self.history.add(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.main.remove(key);
        self.history.remove(key);
    }

    fn len(&self) -> usize {
        self.main.len() + self.history.len()
    }

    fn bytes(&self) -> u64 {
        self.main.bytes() + self.history.bytes()
    }
}
