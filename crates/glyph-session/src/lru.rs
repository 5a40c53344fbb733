use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A capacity-bounded map with least-recently-used eviction.
///
/// Reads through [`LruMap::get`] count as use; [`LruMap::peek`] does not.
/// Eviction is silent and expected: forgotten entries are simply recomputed
/// on next access.
#[derive(Debug)]
pub struct LruMap<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V> LruMap<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }
        self.map.get(key)
    }

    /// Mutable lookup; marks `key` most recently used.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if self.map.contains_key(key) {
            self.touch(key);
        }
        self.map.get_mut(key)
    }

    /// Looks up `key` without affecting recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Inserts `value`, evicting the least-recently-used entry when over
    /// capacity. Returns the evicted pair, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
        } else {
            self.order.push_back(key);
        }

        if self.map.len() <= self.capacity {
            return None;
        }
        let evicted_key = self.order.pop_front()?;
        let evicted_value = self.map.remove(&evicted_key)?;
        Some((evicted_key, evicted_value))
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(value)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        let map = &mut self.map;
        map.retain(|k, v| keep(k, v));
        self.order.retain(|k| map.contains_key(k));
    }

    /// Drains the map in least-to-most-recently-used order.
    pub fn dump(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::with_capacity(self.map.len());
        while let Some(key) = self.order.pop_front() {
            if let Some(value) = self.map.remove(&key) {
                entries.push((key, value));
            }
        }
        entries
    }

    /// Copies the entries in least-to-most-recently-used order.
    pub fn snapshot(&self) -> Vec<(K, V)>
    where
        V: Clone,
    {
        self.order
            .iter()
            .filter_map(|key| self.map.get(key).map(|v| (key.clone(), v.clone())))
            .collect()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.clone());
    }
}
