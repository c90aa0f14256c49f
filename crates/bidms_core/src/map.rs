//! Open-addressing hash map with linear probing.

use crate::config::Config;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::mem;
use tracing::trace;

#[derive(Clone)]
enum Slot<K, V> {
    /// Never used; terminates a probe sequence.
    Empty,
    /// Previously occupied; probing continues past it.
    Available,
    Occupied(K, V),
}

/// Hash map that resolves collisions by linear probing.
///
/// Entries live directly in a slot table. Removal leaves an "available"
/// marker so probe chains stay intact; markers count towards the load
/// factor and are purged whenever the table is rebuilt.
///
/// Lookups report absence with `None`, so a key mapped to a falsy value is
/// distinguishable from a missing key. Iteration order is unspecified.
///
/// # Example
///
/// ```rust
/// use bidms_core::ProbeHashMap;
///
/// let mut map = ProbeHashMap::new();
/// map.insert("urgent", 0);
/// assert_eq!(map.get("urgent"), Some(&0));
/// assert_eq!(map.get("later"), None);
/// ```
#[derive(Clone)]
pub struct ProbeHashMap<K, V, S = RandomState> {
    table: Vec<Slot<K, V>>,
    len: usize,
    tombstones: usize,
    max_load: f64,
    hasher: S,
}

impl<K: Hash + Eq, V> ProbeHashMap<K, V, RandomState> {
    /// Creates an empty map with default capacity and load factor.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Creates an empty map with at least `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&Config::default().map_initial_capacity(capacity))
    }

    /// Creates an empty map sized and tuned by `config`.
    #[must_use]
    pub fn with_config(config: &Config) -> Self {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<K: Hash + Eq, V> Default for ProbeHashMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ProbeHashMap<K, V, S> {
    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of slots in the table.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Iterates over `(key, value)` pairs in unspecified order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.table.iter(),
            remaining: self.len,
        }
    }

    /// Iterates over keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over values in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> ProbeHashMap<K, V, S> {
    /// Creates an empty map using the given hasher builder.
    pub fn with_config_and_hasher(config: &Config, hasher: S) -> Self {
        let capacity = config.map_initial_capacity.max(1);
        let max_load = if config.map_max_load > 0.0 && config.map_max_load < 1.0 {
            config.map_max_load
        } else {
            0.5
        };
        Self {
            table: empty_table(capacity),
            len: 0,
            tombstones: 0,
            max_load,
            hasher,
        }
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.find_slot(key) {
            Ok(index) => match &self.table[index] {
                Slot::Occupied(_, value) => Some(value),
                _ => None,
            },
            Err(_) => None,
        }
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.find_slot(key) {
            Ok(index) => match &mut self.table[index] {
                Slot::Occupied(_, value) => Some(value),
                _ => None,
            },
            Err(_) => None,
        }
    }

    /// Returns true if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot(key).is_ok()
    }

    /// Inserts `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.find_slot(&key) {
            Ok(index) => match &mut self.table[index] {
                Slot::Occupied(_, existing) => Some(mem::replace(existing, value)),
                _ => None,
            },
            Err(index) => {
                if matches!(self.table[index], Slot::Available) {
                    self.tombstones -= 1;
                }
                self.table[index] = Slot::Occupied(key, value);
                self.len += 1;
                self.grow_if_needed();
                None
            }
        }
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.find_slot(key).ok()?;
        match mem::replace(&mut self.table[index], Slot::Available) {
            Slot::Occupied(k, v) => {
                self.len -= 1;
                self.tombstones += 1;
                Some((k, v))
            }
            other => {
                self.table[index] = other;
                None
            }
        }
    }

    /// Removes every entry, keeping the current capacity.
    pub fn clear(&mut self) {
        for slot in &mut self.table {
            *slot = Slot::Empty;
        }
        self.len = 0;
        self.tombstones = 0;
    }

    fn home(&self, key: &(impl Hash + ?Sized)) -> usize {
        (self.hasher.hash_one(key) % self.table.len() as u64) as usize
    }

    /// `Ok(index)` of the slot holding `key`, or `Err(index)` of the slot an
    /// insert should use. The load bound guarantees an empty slot exists.
    fn find_slot<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let capacity = self.table.len();
        let mut index = self.home(key);
        let mut available = None;

        for _ in 0..capacity {
            match &self.table[index] {
                Slot::Empty => return Err(available.unwrap_or(index)),
                Slot::Available => {
                    available.get_or_insert(index);
                }
                Slot::Occupied(k, _) if k.borrow() == key => return Ok(index),
                Slot::Occupied(..) => {}
            }
            index = (index + 1) % capacity;
        }

        Err(available.unwrap_or(index))
    }

    fn grow_if_needed(&mut self) {
        let capacity = self.table.len() as f64;
        if ((self.len + self.tombstones) as f64) <= capacity * self.max_load {
            return;
        }
        let target = if (self.len as f64) * 2.0 > capacity * self.max_load {
            self.table.len() * 2 + 1
        } else {
            self.table.len()
        };
        self.rehash(target);
    }

    fn rehash(&mut self, capacity: usize) {
        trace!(
            from = self.table.len(),
            to = capacity,
            len = self.len,
            tombstones = self.tombstones,
            "probe map rehash"
        );
        let old = mem::replace(&mut self.table, empty_table(capacity));
        self.tombstones = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                if let Err(index) = self.find_slot(&k) {
                    self.table[index] = Slot::Occupied(k, v);
                }
            }
        }
    }
}

fn empty_table<K, V>(capacity: usize) -> Vec<Slot<K, V>> {
    let mut table = Vec::with_capacity(capacity);
    table.resize_with(capacity, || Slot::Empty);
    table
}

/// Borrowing iterator over a [`ProbeHashMap`].
pub struct Iter<'a, K, V> {
    slots: std::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Slot::Occupied(k, v) = slot {
                self.remaining -= 1;
                return Some((k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, S> IntoIterator for &'a ProbeHashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over a [`ProbeHashMap`].
pub struct IntoIter<K, V> {
    slots: std::vec::IntoIter<Slot<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.by_ref().find_map(|slot| match slot {
            Slot::Occupied(k, v) => Some((k, v)),
            _ => None,
        })
    }
}

impl<K, V, S> IntoIterator for ProbeHashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            slots: self.table.into_iter(),
        }
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for ProbeHashMap<K, V, RandomState> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for ProbeHashMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ProbeHashMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
