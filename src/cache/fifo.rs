//! Bounded insertion-order cache.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Fixed-capacity map that evicts the oldest-inserted entry when full.
///
/// Reads do not refresh an entry's position, so this is FIFO, not LRU.
/// Overwriting an existing key keeps its original insertion slot.
#[derive(Debug, Clone)]
pub struct FifoCache<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> FifoCache<K, V> {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a value, returning the evicted entry if the cache was full.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.order
                .pop_front()
                .and_then(|old| self.entries.remove(&old).map(|v| (old, v)))
        } else {
            None
        };

        self.order.push_back(key.clone());
        self.entries.insert(key, value);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_bound() {
        let mut cache = FifoCache::new(3);
        for i in 0..4 {
            cache.insert(i, i * 10);
        }

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains_key(&0));
        assert_eq!(cache.get(&3), Some(&30));
    }

    #[test]
    fn test_evicts_oldest_inserted_not_least_recent() {
        let mut cache = FifoCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);

        // Reading "a" does not protect it
        assert_eq!(cache.get(&"a"), Some(&1));

        let evicted = cache.insert("c", 3);
        assert_eq!(evicted, Some(("a", 1)));
        assert!(cache.contains_key(&"b"));
    }

    #[test]
    fn test_overwrite_keeps_slot() {
        let mut cache = FifoCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("a", 10), None);
        assert_eq!(cache.len(), 2);

        let evicted = cache.insert("c", 3);
        assert_eq!(evicted, Some(("a", 10)));
    }

    #[test]
    fn test_many_inserts_never_exceed_capacity() {
        let mut cache = FifoCache::new(5);
        for i in 0..100 {
            cache.insert(i, ());
            assert!(cache.len() <= 5);
        }
    }
}
