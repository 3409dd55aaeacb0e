//! # Single-Queue LRU Store
//!
//! Byte-bounded, recency-ordered map with an eviction callback. Uses an
//! intrusive doubly linked list realized as an arena of nodes indexed by
//! integer handles, so move-to-front, push-front, and pop-back are all
//! O(1) without unsafe pointer juggling.

use std::collections::HashMap;

use super::{CacheValue, Store};

struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Non-thread-safe, byte-bounded LRU store. `max_bytes == 0` means
/// unbounded: no eviction ever triggers.
pub struct Lru<V: CacheValue> {
    map: HashMap<String, usize>,
    nodes: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: Option<usize>, // most-recently-used
    tail: Option<usize>, // least-recently-used
    max_bytes: u64,
    used_bytes: u64,
    on_evicted: Option<Box<dyn FnMut(&str, &V) + Send>>,
}

impl<V: CacheValue> Lru<V> {
    /// Creates a store with the given byte budget (`0` = unbounded) and an
    /// optional eviction callback, fired exactly once per removal from
    /// [`Store::remove`] or capacity eviction — never from internal
    /// admission transfers (see [`super::Lru2`]).
    pub fn new(max_bytes: u64, on_evicted: Option<Box<dyn FnMut(&str, &V) + Send>>) -> Self {
        Lru {
            map: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            max_bytes,
            used_bytes: 0,
            on_evicted,
        }
    }

    fn entry_size(key: &str, value: &V) -> u64 {
        (key.len() + value.cache_len()) as u64
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("node exists");
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p].as_mut().expect("prev exists").next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].as_mut().expect("next exists").prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.nodes[idx].as_mut() {
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].as_mut().expect("head exists").prev = Some(idx);
        } else {
            self.tail = Some(idx);
        }
        self.head = Some(idx);
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn remove_idx(&mut self, idx: usize, fire_callback: bool) {
        self.detach(idx);
        let node = self.nodes[idx].take().expect("node exists");
        self.map.remove(&node.key);
        self.used_bytes -= Self::entry_size(&node.key, &node.value);
        self.free.push(idx);
        if fire_callback {
            if let Some(callback) = self.on_evicted.as_mut() {
                callback(&node.key, &node.value);
            }
        }
    }

    fn evict_while_over_budget(&mut self) {
        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            match self.tail {
                Some(idx) => self.remove_idx(idx, true),
                None => break,
            }
        }
    }

    /// Removes `key` without invoking the eviction callback, used by
    /// [`super::Lru2`] when it lifts an entry out of history for promotion.
    pub(super) fn remove_silent(&mut self, key: &str) -> Option<V> {
        let idx = *self.map.get(key)?;
        let value = self.nodes[idx].as_ref().expect("node exists").value.clone();
        self.remove_idx(idx, false);
        Some(value)
    }

    pub(super) fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }
}

impl<V: CacheValue> Store<V> for Lru<V> {
    fn get(&mut self, key: &str) -> Option<V> {
        let idx = *self.map.get(key)?;
        self.move_to_front(idx);
        Some(self.nodes[idx].as_ref().expect("node exists").value.clone())
    }

    fn add(&mut self, key: String, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            let old_len = self.nodes[idx].as_ref().expect("node exists").value.cache_len();
            let new_len = value.cache_len();
            if let Some(node) = self.nodes[idx].as_mut() {
                node.value = value;
            }
            self.used_bytes = self.used_bytes + new_len as u64 - old_len as u64;
            self.move_to_front(idx);
        } else {
            let size = Self::entry_size(&key, &value);
            let idx = match self.free.pop() {
                Some(idx) => idx,
                None => {
                    self.nodes.push(None);
                    self.nodes.len() - 1
                }
            };
            self.nodes[idx] = Some(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.push_front(idx);
            self.map.insert(key, idx);
            self.used_bytes += size;
        }
        self.evict_while_over_budget();
    }

    fn remove(&mut self, key: &str) {
        if let Some(&idx) = self.map.get(key) {
            self.remove_idx(idx, true);
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn bytes(&self) -> u64 {
        self.used_bytes
    }
}
