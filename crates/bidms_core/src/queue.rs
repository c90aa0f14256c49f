//! Adaptable min-priority queue addressed by locators.

use crate::error::{CoreError, CoreResult};

/// Handle to an entry in a [`PriorityQueue`].
///
/// A locator stays valid while its entry is in the queue, across any
/// number of heap moves. Once the entry is removed the locator goes stale
/// and every operation taking it fails with [`CoreError::StaleLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    slot: usize,
    generation: u64,
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    /// Index of this entry in the heap array.
    position: usize,
    generation: u64,
}

/// Binary min-heap whose entries can be re-keyed or removed in O(log n).
///
/// Entries are stored in a slab; the heap orders slab indices and each
/// entry records where it sits in the heap. Ties between equal keys are
/// broken arbitrarily.
///
/// # Example
///
/// ```rust
/// use bidms_core::PriorityQueue;
///
/// let mut pq = PriorityQueue::new();
/// let a = pq.add(5, "a");
/// pq.add(3, "b");
/// pq.update(a, 1, "a").unwrap();
/// assert_eq!(pq.remove_min(), Some((1, "a")));
/// ```
#[derive(Debug)]
pub struct PriorityQueue<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    free: Vec<usize>,
    heap: Vec<usize>,
    next_generation: u64,
}

impl<K: PartialOrd, V> Default for PriorityQueue<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialOrd, V> PriorityQueue<K, V> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            heap: Vec::new(),
            next_generation: 0,
        }
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts an entry and returns its locator.
    pub fn add(&mut self, key: K, value: V) -> Locator {
        let generation = self.next_generation;
        self.next_generation += 1;

        let entry = Entry {
            key,
            value,
            position: self.heap.len(),
            generation,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };

        self.heap.push(slot);
        self.upheap(self.heap.len() - 1);
        Locator { slot, generation }
    }

    /// Returns the entry with the smallest key without removing it.
    #[must_use]
    pub fn min(&self) -> Option<(&K, &V)> {
        let slot = *self.heap.first()?;
        self.slots[slot].as_ref().map(|e| (&e.key, &e.value))
    }

    /// Removes and returns the entry with the smallest key.
    pub fn remove_min(&mut self) -> Option<(K, V)> {
        self.remove_at(0)
    }

    /// Replaces the key and value of the entry behind `loc`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StaleLocator`] if the entry is no longer queued.
    pub fn update(&mut self, loc: Locator, key: K, value: V) -> CoreResult<()> {
        let position = {
            let entry = self.entry_mut(loc)?;
            entry.key = key;
            entry.value = value;
            entry.position
        };
        self.bubble(position);
        Ok(())
    }

    /// Removes the entry behind `loc` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StaleLocator`] if the entry is no longer queued.
    pub fn remove(&mut self, loc: Locator) -> CoreResult<(K, V)> {
        let position = self.entry(loc)?.position;
        self.remove_at(position)
            .ok_or(CoreError::StaleLocator { slot: loc.slot })
    }

    /// Returns the key and value behind `loc`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StaleLocator`] if the entry is no longer queued.
    pub fn get(&self, loc: Locator) -> CoreResult<(&K, &V)> {
        let entry = self.entry(loc)?;
        Ok((&entry.key, &entry.value))
    }

    /// Returns true if `loc` still refers to a queued entry.
    #[must_use]
    pub fn contains(&self, loc: Locator) -> bool {
        self.entry(loc).is_ok()
    }

    /// Iterates over entries in heap order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.heap
            .iter()
            .filter_map(|&slot| self.slots[slot].as_ref().map(|e| (&e.key, &e.value)))
    }

    /// Returns references to the `k` smallest entries in ascending key order.
    ///
    /// Walks the heap from the root with an auxiliary frontier, so the
    /// queue itself is left untouched.
    #[must_use]
    pub fn smallest(&self, k: usize) -> Vec<(&K, &V)> {
        let mut out = Vec::with_capacity(k.min(self.len()));
        let mut frontier: Vec<usize> = Vec::new();
        if !self.heap.is_empty() {
            frontier.push(0);
        }

        while out.len() < k {
            let Some(best) = (0..frontier.len()).reduce(|a, b| {
                if self.key_at(frontier[b]) < self.key_at(frontier[a]) {
                    b
                } else {
                    a
                }
            }) else {
                break;
            };
            let position = frontier.swap_remove(best);
            if let Some(entry) = self.slots[self.heap[position]].as_ref() {
                out.push((&entry.key, &entry.value));
            }
            for child in [2 * position + 1, 2 * position + 2] {
                if child < self.heap.len() {
                    frontier.push(child);
                }
            }
        }
        out
    }

    fn entry(&self, loc: Locator) -> CoreResult<&Entry<K, V>> {
        match self.slots.get(loc.slot) {
            Some(Some(entry)) if entry.generation == loc.generation => Ok(entry),
            _ => Err(CoreError::StaleLocator { slot: loc.slot }),
        }
    }

    fn entry_mut(&mut self, loc: Locator) -> CoreResult<&mut Entry<K, V>> {
        match self.slots.get_mut(loc.slot) {
            Some(Some(entry)) if entry.generation == loc.generation => Ok(entry),
            _ => Err(CoreError::StaleLocator { slot: loc.slot }),
        }
    }

    /// Heap position must be in range and its slot occupied.
    fn key_at(&self, position: usize) -> Option<&K> {
        self.slots[self.heap[position]].as_ref().map(|e| &e.key)
    }

    fn less(&self, i: usize, j: usize) -> bool {
        match (self.key_at(i), self.key_at(j)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        for position in [i, j] {
            if let Some(entry) = self.slots[self.heap[position]].as_mut() {
                entry.position = position;
            }
        }
    }

    fn upheap(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.less(position, parent) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn downheap(&mut self, mut position: usize) {
        loop {
            let left = 2 * position + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.heap.len() && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, position) {
                break;
            }
            self.swap(position, child);
            position = child;
        }
    }

    fn bubble(&mut self, position: usize) {
        if position > 0 && self.less(position, (position - 1) / 2) {
            self.upheap(position);
        } else {
            self.downheap(position);
        }
    }

    fn remove_at(&mut self, position: usize) -> Option<(K, V)> {
        let last = self.heap.len().checked_sub(1)?;
        if position != last {
            self.swap(position, last);
        }
        let slot = self.heap.pop()?;
        if position < self.heap.len() {
            self.bubble(position);
        }

        self.free.push(slot);
        self.slots[slot].take().map(|entry| (entry.key, entry.value))
    }
}
