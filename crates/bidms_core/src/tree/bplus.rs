//! In-memory B+ tree with linked leaves.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::types::NodeId;
use std::borrow::Borrow;
use std::collections::VecDeque;
use std::fmt;
use std::mem;
use tracing::debug;

#[derive(Debug, Clone)]
enum NodeKind<V> {
    Internal {
        /// Always `keys.len() + 1` entries.
        children: Vec<NodeId>,
    },
    Leaf {
        values: Vec<V>,
        next: Option<NodeId>,
    },
}

#[derive(Debug, Clone)]
struct Node<K, V> {
    keys: Vec<K>,
    kind: NodeKind<V>,
}

impl<K, V> Node<K, V> {
    fn empty_leaf() -> Self {
        Self {
            keys: Vec::new(),
            kind: NodeKind::Leaf {
                values: Vec::new(),
                next: None,
            },
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// The payload that travels with a key when it moves between siblings.
enum Moved<V> {
    Value(V),
    Child(NodeId),
}

/// B+ tree map: values live only in leaves, leaves are chained in key order.
///
/// `order` is the maximum number of keys a node may hold. A node is split
/// on the way down as soon as it is full, so inserts never back up the
/// tree. Every node except the root keeps at least `ceil(order / 2) - 1`
/// keys.
///
/// # Example
///
/// ```rust
/// use bidms_core::BPlusTree;
///
/// let mut tree = BPlusTree::new();
/// for (k, v) in (0..12).zip('a'..) {
///     tree.insert(k, v);
/// }
/// assert_eq!(tree.search(&6), Some(&'g'));
/// let hits: Vec<_> = tree.search_range(&5, &8).into_iter().map(|(k, _)| *k).collect();
/// assert_eq!(hits, vec![5, 6, 7]);
/// ```
#[derive(Clone)]
pub struct BPlusTree<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
    root: NodeId,
    len: usize,
    order: usize,
}

impl<K: Ord + Clone, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    /// Creates an empty tree of the default order (3).
    #[must_use]
    pub fn new() -> Self {
        Self::build(Config::default().bplus_order)
    }

    /// Creates an empty tree of the given order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if `order` is below 3.
    pub fn with_order(order: usize) -> CoreResult<Self> {
        Self::with_config(&Config::default().bplus_order(order))
    }

    /// Creates an empty tree using `config.bplus_order`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] if the configuration is invalid.
    pub fn with_config(config: &Config) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self::build(config.bplus_order))
    }

    fn build(order: usize) -> Self {
        Self {
            nodes: vec![Node::empty_leaf()],
            free: Vec::new(),
            root: NodeId(0),
            len: 0,
            order,
        }
    }

    /// Maximum keys per node.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Returns the value stored under `key`.
    pub fn search<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let leaf = self.node(self.search_leaf(key));
        let pos = leaf.keys.binary_search_by(|k| k.borrow().cmp(key)).ok()?;
        match &leaf.kind {
            NodeKind::Leaf { values, .. } => values.get(pos),
            NodeKind::Internal { .. } => None,
        }
    }

    /// True if `key` is stored.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(key).is_some()
    }

    /// Entries with `start <= key < end`, ascending, read off the leaf chain.
    pub fn search_range<Q>(&self, start: &Q, end: &Q) -> Vec<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut out = Vec::new();
        let mut cursor = Some(self.search_leaf(start));
        while let Some(id) = cursor {
            let node = self.node(id);
            let NodeKind::Leaf { values, next } = &node.kind else {
                break;
            };
            for (k, v) in node.keys.iter().zip(values) {
                if k.borrow() < start {
                    continue;
                }
                if k.borrow() >= end {
                    return out;
                }
                out.push((k, v));
            }
            cursor = *next;
        }
        out
    }

    /// Iterates over every entry in key order via the leaf chain.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut leaf = self.root;
        while let NodeKind::Internal { children } = &self.node(leaf).kind {
            match children.first() {
                Some(&first) => leaf = first,
                None => break,
            }
        }
        Iter {
            tree: self,
            leaf: Some(leaf),
            pos: 0,
        }
    }

    /// Keys of every node, grouped by level from the root down.
    #[must_use]
    pub fn levels(&self) -> Vec<Vec<&[K]>> {
        let mut levels: Vec<Vec<&[K]>> = Vec::new();
        let mut queue = VecDeque::from([(self.root, 0usize)]);
        while let Some((id, depth)) = queue.pop_front() {
            if levels.len() <= depth {
                levels.push(Vec::new());
            }
            let node = self.node(id);
            levels[depth].push(&node.keys);
            if let NodeKind::Internal { children } = &node.kind {
                queue.extend(children.iter().map(|&c| (c, depth + 1)));
            }
        }
        levels
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Inserts `key`, or overwrites its value if present.
    ///
    /// Returns the previous value on overwrite.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.search_mut(&key) {
            return Some(mem::replace(slot, value));
        }

        if self.node(self.root).keys.len() >= self.order {
            let old_root = self.root;
            let new_root = self.alloc(Node {
                keys: Vec::new(),
                kind: NodeKind::Internal {
                    children: vec![old_root],
                },
            });
            self.split_child(new_root, 0);
            self.root = new_root;
            debug!(root = %new_root, "b+ tree grew a level");
        }

        self.insert_non_full(self.root, key, value);
        self.len += 1;
        None
    }

    /// Replaces the value under `key`. Returns false if `key` is absent.
    pub fn update_value<Q>(&mut self, key: &Q, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Moves the value stored under `old` to `new`.
    ///
    /// Returns false if `old` is absent. An existing entry at `new` is
    /// overwritten.
    pub fn update_key<Q>(&mut self, old: &Q, new: K) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.remove(old) {
            Some(value) => {
                self.insert(new, value);
                true
            }
            None => false,
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (value, _) = self.delete_from(self.root, key)?;
        self.len -= 1;

        let root = self.node(self.root);
        if let NodeKind::Internal { children } = &root.kind {
            if let [only] = children[..] {
                let old_root = self.root;
                self.root = only;
                self.release(old_root);
                debug!(root = %only, "b+ tree lost a level");
            }
        }
        Some(value)
    }

    fn insert_non_full(&mut self, mut id: NodeId, key: K, value: V) {
        loop {
            let node = self.node(id);
            let NodeKind::Internal { children } = &node.kind else {
                let pos = node.keys.partition_point(|k| *k < key);
                let node = self.node_mut(id);
                node.keys.insert(pos, key);
                if let NodeKind::Leaf { values, .. } = &mut node.kind {
                    values.insert(pos, value);
                }
                return;
            };

            let mut pos = node.keys.partition_point(|k| *k <= key);
            let child = children[pos];
            if self.node(child).keys.len() >= self.order {
                self.split_child(id, pos);
                if key >= self.node(id).keys[pos] {
                    pos += 1;
                }
            }
            id = self.child_at(id, pos);
        }
    }

    /// Splits the full child at `index` of `parent`.
    ///
    /// A leaf keeps its lower half and copies the first key of the upper
    /// half into the parent; an internal node moves its middle key up.
    fn split_child(&mut self, parent: NodeId, index: usize) {
        let child = self.child_at(parent, index);
        let node = self.node_mut(child);
        let mid = node.keys.len() / 2;
        let mut upper_keys = node.keys.split_off(mid);

        let (separator, sibling) = match &mut node.kind {
            NodeKind::Leaf { values, next } => {
                let upper_values = values.split_off(mid);
                let separator = upper_keys[0].clone();
                let sibling = Node {
                    keys: upper_keys,
                    kind: NodeKind::Leaf {
                        values: upper_values,
                        next: next.take(),
                    },
                };
                (separator, sibling)
            }
            NodeKind::Internal { children } => {
                let upper_children = children.split_off(mid + 1);
                let separator = upper_keys.remove(0);
                let sibling = Node {
                    keys: upper_keys,
                    kind: NodeKind::Internal {
                        children: upper_children,
                    },
                };
                (separator, sibling)
            }
        };

        let sibling_id = self.alloc(sibling);
        if let NodeKind::Leaf { next, .. } = &mut self.node_mut(child).kind {
            *next = Some(sibling_id);
        }
        let parent = self.node_mut(parent);
        parent.keys.insert(index, separator);
        if let NodeKind::Internal { children } = &mut parent.kind {
            children.insert(index + 1, sibling_id);
        }
    }

    /// Deletes `key` below `id`. Returns the value and whether `id` is now
    /// under its minimum.
    fn delete_from<Q>(&mut self, id: NodeId, key: &Q) -> Option<(V, bool)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let min = self.min_keys();
        let node = self.node(id);
        let pos = match &node.kind {
            NodeKind::Leaf { .. } => {
                let pos = node.keys.binary_search_by(|k| k.borrow().cmp(key)).ok()?;
                let node = self.node_mut(id);
                node.keys.remove(pos);
                let NodeKind::Leaf { values, .. } = &mut node.kind else {
                    return None;
                };
                let value = values.remove(pos);
                return Some((value, node.keys.len() < min));
            }
            NodeKind::Internal { .. } => node.keys.partition_point(|k| k.borrow() <= key),
        };

        let child = self.child_at(id, pos);
        let (value, child_short) = self.delete_from(child, key)?;
        if child_short {
            self.fix_child(id, pos);
            // Rotations and merges can carry the separator one level down.
            let around: Vec<NodeId> = match &self.node(id).kind {
                NodeKind::Internal { children } => {
                    let hi = (pos + 2).min(children.len());
                    children[pos.saturating_sub(1).min(hi)..hi].to_vec()
                }
                NodeKind::Leaf { .. } => Vec::new(),
            };
            for child in around {
                self.correct_separator(child, key);
            }
        }
        self.correct_separator(id, key);
        Some((value, self.node(id).keys.len() < min))
    }

    /// Restores the minimum of child `i` by borrowing from a sibling with
    /// keys to spare, else by merging with one.
    fn fix_child(&mut self, parent: NodeId, i: usize) {
        let min = self.min_keys();
        let child_count = match &self.node(parent).kind {
            NodeKind::Internal { children } => children.len(),
            NodeKind::Leaf { .. } => return,
        };
        let curr = self.child_at(parent, i);
        let left = (i > 0).then(|| self.child_at(parent, i - 1));
        let right = (i + 1 < child_count).then(|| self.child_at(parent, i + 1));

        if let Some(left) = left.filter(|&l| self.node(l).keys.len() > min) {
            self.borrow_from_left(parent, i, left, curr);
        } else if let Some(right) = right.filter(|&r| self.node(r).keys.len() > min) {
            self.borrow_from_right(parent, i, right, curr);
        } else if left.is_some() {
            self.merge(parent, i - 1);
        } else if right.is_some() {
            self.merge(parent, i);
        }
    }

    fn borrow_from_left(&mut self, parent: NodeId, i: usize, left: NodeId, curr: NodeId) {
        let Some((key, moved)) = self.pop_back(left) else {
            return;
        };
        let separator = &mut self.node_mut(parent).keys[i - 1];
        let down = match moved {
            Moved::Value(_) => {
                *separator = key.clone();
                key
            }
            Moved::Child(_) => mem::replace(separator, key),
        };
        self.push_front(curr, down, moved);
    }

    fn borrow_from_right(&mut self, parent: NodeId, i: usize, right: NodeId, curr: NodeId) {
        let Some((key, moved)) = self.pop_front(right) else {
            return;
        };
        let down = match moved {
            Moved::Value(_) => {
                let new_first = self.node(right).keys.first().cloned();
                if let Some(first) = new_first {
                    self.node_mut(parent).keys[i] = first;
                }
                key
            }
            Moved::Child(_) => mem::replace(&mut self.node_mut(parent).keys[i], key),
        };
        self.push_back(curr, down, moved);
    }

    /// Folds child `j + 1` of `parent` into child `j`.
    fn merge(&mut self, parent: NodeId, j: usize) {
        let parent_node = self.node_mut(parent);
        let separator = parent_node.keys.remove(j);
        let NodeKind::Internal { children } = &mut parent_node.kind else {
            return;
        };
        let right = children.remove(j + 1);
        let left = children[j];

        let absorbed = mem::replace(self.node_mut(right), Node::empty_leaf());
        self.free.push(right);

        let target = self.node_mut(left);
        match (&mut target.kind, absorbed.kind) {
            (NodeKind::Leaf { values, next }, NodeKind::Leaf { values: more, next: tail }) => {
                target.keys.extend(absorbed.keys);
                values.extend(more);
                *next = tail;
            }
            (NodeKind::Internal { children }, NodeKind::Internal { children: more }) => {
                target.keys.push(separator);
                target.keys.extend(absorbed.keys);
                children.extend(more);
            }
            // Siblings share a level, so their kinds always agree.
            _ => {}
        }
        debug!(into = %left, from = %right, "b+ tree merged siblings");
    }

    /// Replaces a separator that still names the deleted key with the
    /// smallest key of the subtree to its right.
    fn correct_separator<Q>(&mut self, id: NodeId, key: &Q)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.node(id);
        let Some(j) = node.keys.iter().position(|k| k.borrow() == key) else {
            return;
        };
        let NodeKind::Internal { children } = &node.kind else {
            return;
        };
        let Some(&right) = children.get(j + 1) else {
            return;
        };
        if let Some(min) = self.subtree_min(right).cloned() {
            self.node_mut(id).keys[j] = min;
        }
    }

    // ------------------------------------------------------------------
    // Node plumbing
    // ------------------------------------------------------------------

    fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.nodes[id.index()]
    }

    fn child_at(&self, id: NodeId, i: usize) -> NodeId {
        match &self.node(id).kind {
            NodeKind::Internal { children } => children[i],
            NodeKind::Leaf { .. } => id,
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                *self.node_mut(id) = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId::from_index(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        *self.node_mut(id) = Node::empty_leaf();
        self.free.push(id);
    }

    fn search_leaf<Q>(&self, key: &Q) -> NodeId
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut id = self.root;
        while let NodeKind::Internal { children } = &self.node(id).kind {
            let pos = self.node(id).keys.partition_point(|k| k.borrow() <= key);
            match children.get(pos) {
                Some(&child) => id = child,
                None => break,
            }
        }
        id
    }

    fn search_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let leaf = self.search_leaf(key);
        let node = self.node_mut(leaf);
        let pos = node.keys.binary_search_by(|k| k.borrow().cmp(key)).ok()?;
        match &mut node.kind {
            NodeKind::Leaf { values, .. } => values.get_mut(pos),
            NodeKind::Internal { .. } => None,
        }
    }

    fn subtree_min(&self, mut id: NodeId) -> Option<&K> {
        loop {
            let node = self.node(id);
            match &node.kind {
                NodeKind::Leaf { .. } => return node.keys.first(),
                NodeKind::Internal { children } => id = *children.first()?,
            }
        }
    }

    fn pop_back(&mut self, id: NodeId) -> Option<(K, Moved<V>)> {
        let node = self.node_mut(id);
        let key = node.keys.pop()?;
        let moved = match &mut node.kind {
            NodeKind::Leaf { values, .. } => Moved::Value(values.pop()?),
            NodeKind::Internal { children } => Moved::Child(children.pop()?),
        };
        Some((key, moved))
    }

    fn pop_front(&mut self, id: NodeId) -> Option<(K, Moved<V>)> {
        let node = self.node_mut(id);
        if node.keys.is_empty() {
            return None;
        }
        let key = node.keys.remove(0);
        let moved = match &mut node.kind {
            NodeKind::Leaf { values, .. } => Moved::Value(values.remove(0)),
            NodeKind::Internal { children } => Moved::Child(children.remove(0)),
        };
        Some((key, moved))
    }

    fn push_front(&mut self, id: NodeId, key: K, moved: Moved<V>) {
        let node = self.node_mut(id);
        node.keys.insert(0, key);
        match (&mut node.kind, moved) {
            (NodeKind::Leaf { values, .. }, Moved::Value(v)) => values.insert(0, v),
            (NodeKind::Internal { children }, Moved::Child(c)) => children.insert(0, c),
            _ => {}
        }
    }

    fn push_back(&mut self, id: NodeId, key: K, moved: Moved<V>) {
        let node = self.node_mut(id);
        node.keys.push(key);
        match (&mut node.kind, moved) {
            (NodeKind::Leaf { values, .. }, Moved::Value(v)) => values.push(v),
            (NodeKind::Internal { children }, Moved::Child(c)) => children.push(c),
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Checks occupancy, ordering, separators, uniform leaf depth and the
    /// leaf chain.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvariantViolation`] describing the first fault.
    pub fn validate(&self) -> CoreResult<()> {
        let mut leaf_depth = None;
        let mut leaves = Vec::new();
        let count = self.validate_node(self.root, 0, None, None, &mut leaf_depth, &mut leaves)?;
        if count != self.len {
            return Err(CoreError::invariant(format!(
                "tree holds {count} entries but len is {}",
                self.len
            )));
        }

        // The chain must visit exactly the leaves found by descent, in order.
        let mut chained = Vec::new();
        let mut cursor = leaves.first().copied();
        while let Some(id) = cursor {
            if chained.len() > leaves.len() {
                return Err(CoreError::invariant("leaf chain does not terminate"));
            }
            chained.push(id);
            cursor = match &self.node(id).kind {
                NodeKind::Leaf { next, .. } => *next,
                NodeKind::Internal { .. } => {
                    return Err(CoreError::invariant(format!("leaf chain reaches internal {id}")));
                }
            };
        }
        if chained != leaves {
            return Err(CoreError::invariant("leaf chain disagrees with tree order"));
        }
        Ok(())
    }

    fn validate_node(
        &self,
        id: NodeId,
        depth: usize,
        lower: Option<&K>,
        upper: Option<&K>,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<NodeId>,
    ) -> CoreResult<usize> {
        let node = self
            .nodes
            .get(id.index())
            .ok_or_else(|| CoreError::invariant(format!("dangling child {id}")))?;
        let is_root = id == self.root;

        if node.keys.len() > self.order {
            return Err(CoreError::invariant(format!("{id} overflows with {} keys", node.keys.len())));
        }
        if !is_root && node.keys.len() < self.min_keys() {
            return Err(CoreError::invariant(format!("{id} underflows with {} keys", node.keys.len())));
        }
        if node.keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::invariant(format!("{id} keys out of order")));
        }
        for key in &node.keys {
            if lower.is_some_and(|lo| key < lo) || upper.is_some_and(|hi| key >= hi) {
                return Err(CoreError::invariant(format!("{id} key outside its separators")));
            }
        }

        match &node.kind {
            NodeKind::Leaf { values, .. } => {
                if values.len() != node.keys.len() {
                    return Err(CoreError::invariant(format!("{id} key/value count mismatch")));
                }
                match *leaf_depth {
                    Some(d) if d != depth => {
                        return Err(CoreError::invariant(format!("{id} at depth {depth}, expected {d}")));
                    }
                    _ => *leaf_depth = Some(depth),
                }
                leaves.push(id);
                Ok(node.keys.len())
            }
            NodeKind::Internal { children } => {
                if children.len() != node.keys.len() + 1 {
                    return Err(CoreError::invariant(format!(
                        "{id} has {} keys but {} children",
                        node.keys.len(),
                        children.len()
                    )));
                }
                let mut total = 0;
                for (i, &child) in children.iter().enumerate() {
                    let lo = if i == 0 { lower } else { node.keys.get(i - 1) };
                    let hi = node.keys.get(i).or(upper);
                    total += self.validate_node(child, depth + 1, lo, hi, leaf_depth, leaves)?;
                }
                Ok(total)
            }
        }
    }
}

/// Leaf-chain iterator over a [`BPlusTree`].
pub struct Iter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    leaf: Option<NodeId>,
    pos: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = &self.tree.nodes[self.leaf?.index()];
            let NodeKind::Leaf { values, next } = &node.kind else {
                self.leaf = None;
                return None;
            };
            if let (Some(k), Some(v)) = (node.keys.get(self.pos), values.get(self.pos)) {
                self.pos += 1;
                return Some((k, v));
            }
            self.leaf = *next;
            self.pos = 0;
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for BPlusTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BPlusTree")
            .field("order", &self.order)
            .field("len", &self.len)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(order: usize, keys: impl IntoIterator<Item = i32>) -> BPlusTree<i32, String> {
        let mut tree = BPlusTree::with_order(order).unwrap();
        for k in keys {
            tree.insert(k, format!("v{k}"));
            tree.validate().unwrap();
        }
        tree
    }

    #[test]
    fn rejects_small_order() {
        assert!(matches!(
            BPlusTree::<i32, ()>::with_order(2),
            Err(CoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn insert_and_search() {
        let tree = filled(3, 0..12);
        assert_eq!(tree.len(), 12);
        for k in 0..12 {
            assert_eq!(tree.search(&k), Some(&format!("v{k}")));
        }
        assert_eq!(tree.search(&12), None);
        assert!(tree.levels().len() >= 3);
    }

    #[test]
    fn duplicate_insert_updates_in_place() {
        let mut tree = filled(3, 0..5);
        assert_eq!(tree.insert(3, "new".into()), Some("v3".into()));
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.search(&3).map(String::as_str), Some("new"));
    }

    #[test]
    fn search_range_is_half_open() {
        let tree = filled(3, (0..30).map(|k| k * 2));
        let keys: Vec<i32> = tree.search_range(&5, &11).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![6, 8, 10]);

        let keys: Vec<i32> = tree.search_range(&6, &10).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![6, 8]);

        assert!(tree.search_range(&100, &200).is_empty());
        assert!(tree.search_range(&7, &7).is_empty());
    }

    #[test]
    fn leaf_chain_iterates_in_order() {
        let keys = [15, 3, 9, 1, 12, 7, 4, 13, 2, 8, 11, 6];
        let tree = filled(3, keys);
        let mut expected = keys.to_vec();
        expected.sort_unstable();
        let seen: Vec<i32> = tree.iter().map(|(k, _)| *k).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn delete_rebalances_and_shrinks() {
        let mut tree = filled(3, 0..40);
        let height = tree.levels().len();

        for k in (0..40).step_by(3) {
            assert_eq!(tree.remove(&k), Some(format!("v{k}")));
            tree.validate().unwrap();
        }
        assert_eq!(tree.remove(&0), None);

        for k in 0..40 {
            if k % 3 != 0 {
                assert!(tree.remove(&k).is_some(), "missing {k}");
                tree.validate().unwrap();
            }
        }
        assert!(tree.is_empty());
        assert_eq!(tree.levels().len(), 1);
        assert!(height > 1);
    }

    #[test]
    fn separators_never_name_deleted_keys() {
        let mut tree = filled(3, 0..20);
        for k in [4, 9, 11, 0, 13] {
            tree.remove(&k);
            for level in tree.levels().iter().take(tree.levels().len() - 1) {
                for keys in level {
                    assert!(!keys.contains(&k), "separator {k} survived");
                }
            }
        }
    }

    #[test]
    fn update_value_and_key() {
        let mut tree = filled(3, 0..10);
        assert!(tree.update_value(&4, "four".into()));
        assert!(!tree.update_value(&40, "x".into()));
        assert_eq!(tree.search(&4).map(String::as_str), Some("four"));

        assert!(tree.update_key(&4, 44));
        assert_eq!(tree.search(&4), None);
        assert_eq!(tree.search(&44).map(String::as_str), Some("four"));
        assert!(!tree.update_key(&4, 45));
        assert_eq!(tree.len(), 10);
        tree.validate().unwrap();
    }

    #[test]
    fn larger_orders() {
        for order in [4, 5, 8] {
            let mut tree = filled(order, (0..200).rev());
            for k in (0..200).filter(|k| k % 2 == 1) {
                tree.remove(&k);
            }
            tree.validate().unwrap();
            assert_eq!(tree.len(), 100);
            assert_eq!(tree.order(), order);
        }
    }

    #[test]
    fn freed_nodes_are_reused() {
        let mut tree = filled(3, 0..50);
        for k in 0..50 {
            tree.remove(&k);
        }
        let slots = tree.nodes.len();
        for k in 0..50 {
            tree.insert(k, String::new());
        }
        assert_eq!(tree.nodes.len(), slots);
        tree.validate().unwrap();
    }
}
