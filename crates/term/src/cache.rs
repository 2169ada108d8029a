//! Bounded least-recently-used cache.
//!
//! Recency is tracked with an access list of `(key, stamp)` pairs. A stale
//! pair (its key was touched again later) is skipped when evicting, and the
//! list is compacted once it grows well past the live entry count.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    order: VecDeque<(K, u64)>,
    clock: u64,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.clock += 1;
        let now = self.clock;
        match self.entries.get_mut(key) {
            Some((value, stamp)) => {
                *stamp = now;
                let value = value.clone();
                self.order.push_back((key.clone(), now));
                self.stats.hits += 1;
                self.compact();
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.clock += 1;
        let now = self.clock;
        self.entries.insert(key.clone(), (value, now));
        self.order.push_back((key, now));
        while self.entries.len() > self.capacity {
            let Some((key, stamp)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&key).is_some_and(|(_, s)| *s == stamp) {
                self.entries.remove(&key);
                self.stats.evictions += 1;
            }
        }
        self.compact();
    }

    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(&key) {
            return v;
        }
        let value = make();
        self.insert(key, value.clone());
        value
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn compact(&mut self) {
        if self.order.len() <= self.capacity * 4 + 16 {
            return;
        }
        let entries = &self.entries;
        self.order
            .retain(|(k, s)| entries.get(k).is_some_and(|(_, live)| live == s));
    }
}
