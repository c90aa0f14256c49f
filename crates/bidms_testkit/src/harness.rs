//! Model-checking harness for the ordered structures.
//!
//! Replays [`KeyOp`] sequences against every ordered structure at once and
//! compares each answer with a `BTreeMap` reference.

use crate::generators::KeyOp;
use bidms_core::{AvlTreeMap, BPlusTree, DiskBTree, InMemoryBackend, ProbeHashMap};
use std::collections::BTreeMap;

/// Value stored under a key by the harness.
#[must_use]
pub fn value_for(key: i64) -> i64 {
    key.wrapping_mul(31) ^ 0x5a
}

/// Runs key operations against the AVL map, B+ tree, probe map and disk
/// B-tree in lockstep with a reference model.
pub struct OrderedHarness {
    /// AVL map under test.
    pub avl: AvlTreeMap<i64, i64>,
    /// B+ tree under test.
    pub bplus: BPlusTree<i64, i64>,
    /// Probe hash map under test.
    pub probe: ProbeHashMap<i64, i64>,
    /// Disk B-tree under test (keys only).
    pub disk: DiskBTree<InMemoryBackend>,
    model: BTreeMap<i64, i64>,
}

impl OrderedHarness {
    /// Creates a harness with a default-order B+ tree.
    pub fn new() -> Self {
        Self::with_bplus_order(3)
    }

    /// Creates a harness whose B+ tree has the given order.
    pub fn with_bplus_order(order: usize) -> Self {
        Self {
            avl: AvlTreeMap::new(),
            bplus: BPlusTree::with_order(order).expect("Invalid B+ order"),
            probe: ProbeHashMap::new(),
            disk: DiskBTree::new(InMemoryBackend::new()).expect("Failed to create disk tree"),
            model: BTreeMap::new(),
        }
    }

    /// Applies one operation everywhere and asserts that all structures
    /// agree with the model.
    pub fn apply(&mut self, op: KeyOp) {
        match op {
            KeyOp::Insert(k) => {
                let v = value_for(k);
                let expected = self.model.insert(k, v);
                assert_eq!(self.avl.insert(k, v), expected, "avl insert {k}");
                assert_eq!(self.bplus.insert(k, v), expected, "b+ insert {k}");
                assert_eq!(self.probe.insert(k, v), expected, "probe insert {k}");
                let added = self.disk.insert(k).expect("Disk insert failed");
                assert_eq!(added, expected.is_none(), "disk insert {k}");
            }
            KeyOp::Remove(k) => {
                let expected = self.model.remove(&k);
                assert_eq!(self.avl.remove(&k), expected, "avl remove {k}");
                assert_eq!(self.bplus.remove(&k), expected, "b+ remove {k}");
                assert_eq!(self.probe.remove(&k), expected, "probe remove {k}");
                let removed = self.disk.remove(k).expect("Disk remove failed");
                assert_eq!(removed, expected.is_some(), "disk remove {k}");
            }
            KeyOp::Get(k) => {
                let expected = self.model.get(&k);
                assert_eq!(self.avl.get(&k), expected, "avl get {k}");
                assert_eq!(self.bplus.search(&k), expected, "b+ get {k}");
                assert_eq!(self.probe.get(&k), expected, "probe get {k}");
                let found = self.disk.contains(k).expect("Disk search failed");
                assert_eq!(found, expected.is_some(), "disk get {k}");
            }
        }
    }

    /// Applies every operation, checking structure invariants after each.
    pub fn run(&mut self, ops: &[KeyOp]) {
        for &op in ops {
            self.apply(op);
            self.verify_structure();
        }
        self.verify_all();
    }

    /// Asserts the structural invariants of every tree.
    pub fn verify_structure(&self) {
        self.avl.validate().expect("AVL invariant broken");
        self.bplus.validate().expect("B+ invariant broken");
        self.disk.validate().expect("Disk B-tree invariant broken");
    }

    /// Asserts that full scans of every structure match the model.
    pub fn verify_all(&self) {
        let expected: Vec<(i64, i64)> = self.model.iter().map(|(&k, &v)| (k, v)).collect();

        let avl: Vec<(i64, i64)> = self.avl.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(avl, expected, "avl scan");

        let bplus: Vec<(i64, i64)> = self.bplus.iter().map(|(&k, &v)| (k, v)).collect();
        assert_eq!(bplus, expected, "b+ scan");

        let mut probe: Vec<(i64, i64)> = self.probe.iter().map(|(&k, &v)| (k, v)).collect();
        probe.sort_unstable();
        assert_eq!(probe, expected, "probe scan");

        let keys: Vec<i64> = expected.iter().map(|&(k, _)| k).collect();
        assert_eq!(self.disk.keys().expect("Disk scan failed"), keys, "disk scan");

        assert_eq!(self.avl.len(), self.model.len());
        assert_eq!(self.bplus.len(), self.model.len());
        assert_eq!(self.probe.len(), self.model.len());
    }

    /// Returns the number of keys in the model.
    pub fn tracked_count(&self) -> usize {
        self.model.len()
    }

    /// Keys in `[start, end)` according to the model.
    pub fn model_range(&self, start: i64, end: i64) -> Vec<i64> {
        if start >= end {
            return Vec::new();
        }
        self.model.range(start..end).map(|(&k, _)| k).collect()
    }
}

impl Default for OrderedHarness {
    fn default() -> Self {
        Self::new()
    }
}
