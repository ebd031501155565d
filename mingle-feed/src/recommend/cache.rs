use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use mingle_shared::models::UserProfile;

/// Insertion-ordered map with a hard capacity.
///
/// Inserting a batch that would overflow first evicts as many of the oldest
/// entries as the batch adds, so the cache never exceeds `capacity`.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
}

pub type EmbeddingCache = BoundedCache<String, Vec<f32>>;
pub type ProfileCache = BoundedCache<String, UserProfile>;

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
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

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_batch(vec![(key, value)]);
    }

    pub fn insert_batch(&mut self, batch: Vec<(K, V)>) {
        // Existing keys are refreshed in place; duplicates in the batch keep
        // their last value at their first position.
        let mut fresh: Vec<(K, V)> = Vec::new();
        let mut positions: HashMap<K, usize> = HashMap::new();
        for (key, value) in batch {
            if let Some(existing) = self.entries.get_mut(&key) {
                *existing = value;
            } else if let Some(&pos) = positions.get(&key) {
                fresh[pos].1 = value;
            } else {
                positions.insert(key.clone(), fresh.len());
                fresh.push((key, value));
            }
        }

        if fresh.len() > self.capacity {
            let skip = fresh.len() - self.capacity;
            fresh.drain(..skip);
        }
        if fresh.is_empty() {
            return;
        }

        if self.entries.len() + fresh.len() > self.capacity {
            let evict = fresh.len().min(self.entries.len());
            for key in self.order.drain(..evict) {
                self.entries.remove(&key);
            }
        }

        for (key, value) in fresh {
            self.order.push_back(key.clone());
            self.entries.insert(key, value);
        }
    }

    /// Keys not cached yet, de-duplicated, in first-seen order.
    pub fn missing<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> Vec<K>
    where
        K: 'a,
    {
        let mut seen = HashSet::new();
        keys.into_iter()
            .filter(|k| !self.contains(k) && seen.insert((*k).clone()))
            .cloned()
            .collect()
    }
}
