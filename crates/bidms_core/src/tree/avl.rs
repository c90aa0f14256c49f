//! Height-balanced (AVL) ordered map.

use crate::error::{CoreError, CoreResult};
use crate::types::NodeId;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::ops::{Bound, RangeBounds};

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    /// Leaf height is 1; an absent child counts as 0.
    height: usize,
}

/// Ordered map backed by an AVL tree.
///
/// Nodes are kept densely packed in a vector; removing a node moves the
/// last node into its slot, so a [`NodeId`] is only stable until the next
/// removal and is never handed out.
///
/// # Example
///
/// ```rust
/// use bidms_core::AvlTreeMap;
///
/// let mut tasks = AvlTreeMap::new();
/// tasks.insert(-12, "deploy");
/// tasks.insert(-3, "lint");
/// tasks.insert(-40, "outage");
///
/// assert_eq!(tasks.find_min(), Some((&-40, &"outage")));
/// let first_two: Vec<_> = tasks.range(..-3).map(|(_, v)| *v).collect();
/// assert_eq!(first_two, vec!["outage", "deploy"]);
/// ```
#[derive(Clone)]
pub struct AvlTreeMap<K, V> {
    nodes: Vec<Node<K, V>>,
    root: Option<NodeId>,
}

impl<K, V> Default for AvlTreeMap<K, V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<K, V> AvlTreeMap<K, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Height of the tree; 0 when empty.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Entry with the smallest key.
    #[must_use]
    pub fn find_min(&self) -> Option<(&K, &V)> {
        self.root.map(|r| self.entry(self.subtree_first(r)))
    }

    /// Entry with the largest key.
    #[must_use]
    pub fn find_max(&self) -> Option<(&K, &V)> {
        self.root.map(|r| self.entry(self.subtree_last(r)))
    }

    /// Iterates over all entries in ascending key order.
    pub fn iter(&self) -> Range<'_, K, V> {
        Range {
            tree: self,
            next: self.root.map(|r| self.subtree_first(r)),
            stop: None,
        }
    }

    /// Iterates over keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over values in ascending key order.
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    fn entry(&self, id: NodeId) -> (&K, &V) {
        let node = self.node(id);
        (&node.key, &node.value)
    }

    fn height_of(&self, id: Option<NodeId>) -> usize {
        id.map_or(0, |id| self.node(id).height)
    }

    fn subtree_first(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    fn subtree_last(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.node(id).right {
            id = right;
        }
        id
    }

    /// In-order successor.
    fn after(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.node(id).right {
            return Some(self.subtree_first(right));
        }
        let mut child = id;
        let mut parent = self.node(id).parent;
        while let Some(p) = parent {
            if self.node(p).right != Some(child) {
                break;
            }
            child = p;
            parent = self.node(p).parent;
        }
        parent
    }

    // ------------------------------------------------------------------
    // Restructuring
    // ------------------------------------------------------------------

    fn relink(&mut self, parent: NodeId, child: Option<NodeId>, make_left: bool) {
        if make_left {
            self.node_mut(parent).left = child;
        } else {
            self.node_mut(parent).right = child;
        }
        if let Some(child) = child {
            self.node_mut(child).parent = Some(parent);
        }
    }

    /// Rotates `x` above its parent.
    fn rotate(&mut self, x: NodeId) {
        let Some(y) = self.node(x).parent else {
            return;
        };
        match self.node(y).parent {
            None => {
                self.root = Some(x);
                self.node_mut(x).parent = None;
            }
            Some(z) => {
                let was_left = self.node(z).left == Some(y);
                self.relink(z, Some(x), was_left);
            }
        }
        if self.node(y).left == Some(x) {
            let inner = self.node(x).right;
            self.relink(y, inner, true);
            self.relink(x, Some(y), false);
        } else {
            let inner = self.node(x).left;
            self.relink(y, inner, false);
            self.relink(x, Some(y), true);
        }
    }

    /// Trinode restructuring around `x`, its parent and grandparent.
    /// Returns the node now at the top of the three.
    fn restructure(&mut self, x: NodeId) -> NodeId {
        let Some(y) = self.node(x).parent else {
            return x;
        };
        let Some(z) = self.node(y).parent else {
            return x;
        };
        let x_right = self.node(y).right == Some(x);
        let y_right = self.node(z).right == Some(y);
        if x_right == y_right {
            self.rotate(y);
            y
        } else {
            self.rotate(x);
            self.rotate(x);
            x
        }
    }

    fn recompute_height(&mut self, id: Option<NodeId>) {
        if let Some(id) = id {
            let node = self.node(id);
            let height = 1 + self.height_of(node.left).max(self.height_of(node.right));
            self.node_mut(id).height = height;
        }
    }

    fn is_balanced(&self, id: NodeId) -> bool {
        let node = self.node(id);
        self.height_of(node.left).abs_diff(self.height_of(node.right)) <= 1
    }

    fn tall_child(&self, id: NodeId, favor_left: bool) -> Option<NodeId> {
        let node = self.node(id);
        if self.height_of(node.left) + usize::from(favor_left) > self.height_of(node.right) {
            node.left
        } else {
            node.right
        }
    }

    /// Ties at the grandchild level go to the same side as the child.
    fn tall_grandchild(&self, id: NodeId) -> Option<NodeId> {
        let child = self.tall_child(id, false)?;
        let aligned_left = self.node(id).left == Some(child);
        self.tall_child(child, aligned_left)
    }

    /// Walks up from `start` restoring balance; stops once a height holds.
    fn rebalance(&mut self, start: Option<NodeId>) {
        let mut cursor = start;
        while let Some(mut id) = cursor {
            let old_height = self.node(id).height;
            if !self.is_balanced(id) {
                if let Some(grandchild) = self.tall_grandchild(id) {
                    id = self.restructure(grandchild);
                    let (left, right) = (self.node(id).left, self.node(id).right);
                    self.recompute_height(left);
                    self.recompute_height(right);
                }
            }
            self.recompute_height(Some(id));

            cursor = if self.node(id).height == old_height {
                None
            } else {
                self.node(id).parent
            };
        }
    }

    // ------------------------------------------------------------------
    // Arena maintenance
    // ------------------------------------------------------------------

    fn swap_items(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let (lo, hi) = if a.index() < b.index() { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi.index());
        let first = &mut head[lo.index()];
        let second = &mut tail[0];
        mem::swap(&mut first.key, &mut second.key);
        mem::swap(&mut first.value, &mut second.value);
    }

    /// Drops the unlinked node `id`, moving the last node into its slot.
    /// `watch` is translated if it named the moved node.
    fn release(&mut self, id: NodeId, watch: Option<NodeId>) -> (Node<K, V>, Option<NodeId>) {
        let last = NodeId::from_index(self.nodes.len() - 1);
        let node = self.nodes.swap_remove(id.index());
        if id == last {
            return (node, watch);
        }

        let moved = self.node(id);
        let (parent, left, right) = (moved.parent, moved.left, moved.right);
        match parent {
            Some(p) if self.node(p).left == Some(last) => self.node_mut(p).left = Some(id),
            Some(p) => self.node_mut(p).right = Some(id),
            None => self.root = Some(id),
        }
        for child in [left, right].into_iter().flatten() {
            self.node_mut(child).parent = Some(id);
        }

        let watch = if watch == Some(last) { Some(id) } else { watch };
        (node, watch)
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Returns the value stored for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|id| &self.node(id).value)
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let id = self.find(key)?;
        Some(&mut self.node_mut(id).value)
    }

    /// True if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Inserts or overwrites, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(mut cursor) = self.root else {
            let root = self.push(key, value, None);
            self.root = Some(root);
            self.rebalance(Some(root));
            return None;
        };

        let leaf = loop {
            let node = self.node(cursor);
            match key.cmp(&node.key) {
                Ordering::Equal => {
                    return Some(mem::replace(&mut self.node_mut(cursor).value, value));
                }
                Ordering::Less => match node.left {
                    Some(left) => cursor = left,
                    None => {
                        let leaf = self.push(key, value, Some(cursor));
                        self.node_mut(cursor).left = Some(leaf);
                        break leaf;
                    }
                },
                Ordering::Greater => match node.right {
                    Some(right) => cursor = right,
                    None => {
                        let leaf = self.push(key, value, Some(cursor));
                        self.node_mut(cursor).right = Some(leaf);
                        break leaf;
                    }
                },
            }
        };

        self.rebalance(Some(leaf));
        None
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut id = self.find(key)?;

        if let (Some(left), Some(_)) = (self.node(id).left, self.node(id).right) {
            let predecessor = self.subtree_last(left);
            self.swap_items(id, predecessor);
            id = predecessor;
        }

        let node = self.node(id);
        let child = node.left.or(node.right);
        let parent = node.parent;
        if let Some(child) = child {
            self.node_mut(child).parent = parent;
        }
        match parent {
            None => self.root = child,
            Some(p) if self.node(p).left == Some(id) => self.node_mut(p).left = child,
            Some(p) => self.node_mut(p).right = child,
        }

        let (removed, parent) = self.release(id, parent);
        self.rebalance(parent);
        Some((removed.key, removed.value))
    }

    /// Entry with the least key greater than or equal to `key`.
    pub fn find_ge<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.lower_bound(Bound::Included(key)).map(|id| self.entry(id))
    }

    /// Lazily iterates over entries whose keys fall in `range`, ascending.
    ///
    /// `a..b` is half-open; `..b`, `a..` and `..` leave an end open. Calling
    /// again restarts from the current contents.
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        R: RangeBounds<Q>,
    {
        let mut next = self.lower_bound(range.start_bound());
        let stop = match range.end_bound() {
            Bound::Included(key) => self.lower_bound(Bound::Excluded(key)),
            Bound::Excluded(key) => self.lower_bound(Bound::Included(key)),
            Bound::Unbounded => None,
        };
        if let (Some(first), Some(past)) = (next, stop) {
            if self.node(first).key >= self.node(past).key {
                next = None;
            }
        }
        Range {
            tree: self,
            next,
            stop,
        }
    }

    /// Checks ordering, heights, balance and parent links.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvariantViolation`] describing the first fault.
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(root) = self.root {
            if self.node(root).parent.is_some() {
                return Err(CoreError::invariant("root has a parent"));
            }
        }
        let count = self.validate_subtree(self.root, None)?.1;
        if count != self.len() {
            return Err(CoreError::invariant(format!(
                "reachable nodes {count} != stored {}",
                self.len()
            )));
        }
        let keys: Vec<&K> = self.keys().collect();
        if keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::invariant("in-order keys are not strictly ascending"));
        }
        Ok(())
    }

    /// Returns (height, node count) of the subtree.
    fn validate_subtree(&self, id: Option<NodeId>, parent: Option<NodeId>) -> CoreResult<(usize, usize)> {
        let Some(id) = id else {
            return Ok((0, 0));
        };
        let node = self
            .nodes
            .get(id.index())
            .ok_or_else(|| CoreError::invariant(format!("dangling link to {id}")))?;
        if node.parent != parent {
            return Err(CoreError::invariant(format!("{id} has a wrong parent link")));
        }
        if let Some(left) = node.left {
            if self.node(left).key >= node.key {
                return Err(CoreError::invariant(format!("{id} left child out of order")));
            }
        }
        if let Some(right) = node.right {
            if self.node(right).key <= node.key {
                return Err(CoreError::invariant(format!("{id} right child out of order")));
            }
        }
        let (lh, lc) = self.validate_subtree(node.left, Some(id))?;
        let (rh, rc) = self.validate_subtree(node.right, Some(id))?;
        if lh.abs_diff(rh) > 1 {
            return Err(CoreError::invariant(format!("{id} unbalanced: {lh} vs {rh}")));
        }
        let height = 1 + lh.max(rh);
        if node.height != height {
            return Err(CoreError::invariant(format!(
                "{id} caches height {} but has {height}",
                node.height
            )));
        }
        Ok((height, lc + rc + 1))
    }

    fn push(&mut self, key: K, value: V, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 0,
        });
        id
    }

    fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        while let Some(id) = cursor {
            let node = self.node(id);
            cursor = match key.cmp(node.key.borrow()) {
                Ordering::Equal => return Some(id),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    /// First node whose key satisfies `bound` as a lower bound.
    fn lower_bound<Q>(&self, bound: Bound<&Q>) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        let mut best = None;
        while let Some(id) = cursor {
            let node = self.node(id);
            let key = node.key.borrow();
            let fits = match bound {
                Bound::Included(b) => key >= b,
                Bound::Excluded(b) => key > b,
                Bound::Unbounded => true,
            };
            if fits {
                best = Some(id);
                cursor = node.left;
            } else {
                cursor = node.right;
            }
        }
        best
    }
}

/// In-order iterator over a slice of an [`AvlTreeMap`].
pub struct Range<'a, K, V> {
    tree: &'a AvlTreeMap<K, V>,
    next: Option<NodeId>,
    /// First node past the end; `None` runs to the last entry.
    stop: Option<NodeId>,
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        if Some(id) == self.stop {
            self.next = None;
            return None;
        }
        self.next = self.tree.after(id);
        Some(self.tree.entry(id))
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Range<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_keys<K: Copy, V>(tree: &AvlTreeMap<K, V>) -> Vec<K> {
        tree.keys().copied().collect()
    }

    #[test]
    fn empty_map() {
        let tree: AvlTreeMap<i32, ()> = AvlTreeMap::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert!(tree.find_min().is_none());
        assert!(tree.find_ge(&3).is_none());
        assert_eq!(tree.iter().count(), 0);
        assert_eq!(tree.range(0..10).count(), 0);
        tree.validate().unwrap();
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut tree = AvlTreeMap::new();
        for k in 0..1000 {
            tree.insert(k, k * 2);
        }
        tree.validate().unwrap();
        assert_eq!(tree.len(), 1000);
        // An AVL tree of 1000 nodes is at most ~1.44 log2(1000) tall.
        assert!(tree.height() <= 14, "height {}", tree.height());
        assert_eq!(tree.get(&500), Some(&1000));
    }

    #[test]
    fn insert_overwrites() {
        let mut tree = AvlTreeMap::new();
        assert_eq!(tree.insert("k", 1), None);
        assert_eq!(tree.insert("k", 2), Some(1));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("k"), Some(&2));
    }

    #[test]
    fn remove_leaf_single_child_and_two_children() {
        let mut tree: AvlTreeMap<i32, i32> = [50, 30, 70, 20, 40, 60, 80, 35]
            .into_iter()
            .map(|k| (k, k))
            .collect();

        assert_eq!(tree.remove(&20), Some(20)); // leaf
        tree.validate().unwrap();
        assert_eq!(tree.remove(&40), Some(40)); // one child
        tree.validate().unwrap();
        assert_eq!(tree.remove(&50), Some(50)); // two children
        tree.validate().unwrap();
        assert_eq!(tree.remove(&50), None);

        assert_eq!(collect_keys(&tree), vec![30, 35, 60, 70, 80]);
    }

    #[test]
    fn remove_everything_in_mixed_order() {
        let keys: Vec<i32> = (0..200).map(|i| (i * 37) % 200).collect();
        let mut tree: AvlTreeMap<i32, ()> = keys.iter().map(|&k| (k, ())).collect();

        for (i, k) in keys.iter().rev().enumerate() {
            assert!(tree.remove(k).is_some());
            tree.validate().unwrap();
            assert_eq!(tree.len(), 199 - i);
        }
        assert!(tree.is_empty());
    }

    #[test]
    fn find_min_max_and_ge() {
        let tree: AvlTreeMap<i32, &str> = [(10, "a"), (20, "b"), (30, "c")].into_iter().collect();
        assert_eq!(tree.find_min(), Some((&10, &"a")));
        assert_eq!(tree.find_max(), Some((&30, &"c")));
        assert_eq!(tree.find_ge(&15), Some((&20, &"b")));
        assert_eq!(tree.find_ge(&20), Some((&20, &"b")));
        assert_eq!(tree.find_ge(&31), None);
    }

    #[test]
    fn range_is_half_open() {
        let tree: AvlTreeMap<i32, ()> = (0..20).map(|k| (k * 5, ())).collect();

        let in_range: Vec<_> = tree.range(10..30).map(|(k, _)| *k).collect();
        assert_eq!(in_range, vec![10, 15, 20, 25]);

        let open_start: Vec<_> = tree.range(..12).map(|(k, _)| *k).collect();
        assert_eq!(open_start, vec![0, 5, 10]);

        let open_end: Vec<_> = tree.range(86..).map(|(k, _)| *k).collect();
        assert_eq!(open_end, vec![90, 95]);

        let inclusive: Vec<_> = tree.range(10..=20).map(|(k, _)| *k).collect();
        assert_eq!(inclusive, vec![10, 15, 20]);

        assert_eq!(tree.range(11..14).count(), 0);
        assert_eq!(tree.range(200..300).count(), 0);
    }

    #[test]
    fn inverted_range_is_empty() {
        let tree: AvlTreeMap<i32, ()> = (0..10).map(|k| (k, ())).collect();
        #[allow(clippy::reversed_empty_ranges)]
        let count = tree.range(7..3).count();
        assert_eq!(count, 0);
    }

    #[test]
    fn range_is_restartable() {
        let mut tree: AvlTreeMap<i32, ()> = (0..5).map(|k| (k, ())).collect();
        assert_eq!(tree.range(1..4).count(), 3);
        tree.insert(2, ());
        tree.remove(&3);
        assert_eq!(tree.range(1..4).count(), 2);
    }

    #[test]
    fn get_mut_and_borrowed_lookup() {
        let mut tree = AvlTreeMap::new();
        tree.insert(String::from("alpha"), 1);
        *tree.get_mut("alpha").unwrap() += 1;
        assert_eq!(tree.get("alpha"), Some(&2));
        assert!(tree.contains_key("alpha"));
        assert!(!tree.contains_key("beta"));
    }

    #[test]
    fn debug_lists_entries_in_order() {
        let tree: AvlTreeMap<i32, char> = [(2, 'b'), (1, 'a')].into_iter().collect();
        assert_eq!(format!("{tree:?}"), "{1: 'a', 2: 'b'}");
    }
}
