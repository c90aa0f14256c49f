//! B-tree over fixed-size records in a storage backend.

use super::node::{DiskNode, MAX_KEYS, MIN_DEGREE, NODE_SIZE};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use bidms_storage::StorageBackend;
use tracing::{debug, trace};

/// Disk-resident B-tree of `i64` keys with minimum degree 3.
///
/// Every node lives in a [`NODE_SIZE`]-byte record addressed by its byte
/// offset. Nothing is cached between calls: each access reads the record
/// and each change writes it straight back. The tree does not record its
/// own root, so the caller keeps [`Self::root_offset`] and hands it back to
/// [`Self::open`] next time.
///
/// Offsets released by merges and root shrinks are recycled by later
/// allocations within the same session.
///
/// # Example
///
/// ```rust
/// use bidms_core::DiskBTree;
/// use bidms_core::InMemoryBackend;
///
/// let mut tree = DiskBTree::new(InMemoryBackend::new()).unwrap();
/// for k in [2, 3, 4, 5, 6, 12] {
///     tree.insert(k).unwrap();
/// }
/// assert_eq!(tree.root_offset(), Some(97));
/// assert!(tree.contains(4).unwrap());
/// ```
#[derive(Debug)]
pub struct DiskBTree<S> {
    backend: S,
    root: Option<u64>,
    free: Vec<u64>,
    sync_on_write: bool,
}

impl<S: StorageBackend> DiskBTree<S> {
    /// Starts an empty tree. New records are appended after any existing
    /// data.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size is not a whole number of records.
    pub fn new(backend: S) -> CoreResult<Self> {
        Self::with_config(backend, &Config::default())
    }

    /// Starts an empty tree with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the backend size
    /// is not a whole number of records.
    pub fn with_config(backend: S, config: &Config) -> CoreResult<Self> {
        Self::build(backend, None, config)
    }

    /// Reopens a tree whose root record is at `root_offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root record cannot be read or decoded.
    pub fn open(backend: S, root_offset: u64) -> CoreResult<Self> {
        Self::open_with_config(backend, root_offset, &Config::default())
    }

    /// Reopens a tree with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the root record
    /// cannot be read or decoded.
    pub fn open_with_config(backend: S, root_offset: u64, config: &Config) -> CoreResult<Self> {
        let tree = Self::build(backend, Some(root_offset), config)?;
        let root = tree.read_node(root_offset)?;
        debug!(root = root_offset, keys = root.len(), "disk b-tree opened");
        Ok(tree)
    }

    fn build(backend: S, root: Option<u64>, config: &Config) -> CoreResult<Self> {
        config.validate()?;
        let size = backend.size()?;
        if size % NODE_SIZE as u64 != 0 {
            return Err(CoreError::invalid_format(format!(
                "store size {size} is not a multiple of {NODE_SIZE}"
            )));
        }
        if let Some(offset) = root {
            if offset % NODE_SIZE as u64 != 0 || offset >= size {
                return Err(CoreError::corrupt_node(offset, "root is not a record boundary"));
            }
        }
        Ok(Self {
            backend,
            root,
            free: Vec::new(),
            sync_on_write: config.sync_on_write,
        })
    }

    /// Offset of the root record, `None` for an empty tree.
    ///
    /// Persist this value to reopen the tree later.
    #[must_use]
    pub fn root_offset(&self) -> Option<u64> {
        self.root
    }

    /// True if the tree holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The underlying store.
    #[must_use]
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Consumes the tree and returns the store.
    pub fn into_backend(self) -> S {
        self.backend
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Returns the node holding `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if a record on the path cannot be read.
    pub fn search(&self, key: i64) -> CoreResult<Option<DiskNode>> {
        let Some(mut offset) = self.root else {
            return Ok(None);
        };
        loop {
            let node = self.read_node(offset)?;
            let i = node.find_key(key);
            if node.keys.get(i) == Some(&key) {
                return Ok(Some(node));
            }
            if node.leaf {
                return Ok(None);
            }
            offset = node.children[i];
        }
    }

    /// True if `key` is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a record on the path cannot be read.
    pub fn contains(&self, key: i64) -> CoreResult<bool> {
        Ok(self.search(key)?.is_some())
    }

    /// All keys in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if any record cannot be read.
    pub fn keys(&self) -> CoreResult<Vec<i64>> {
        let mut out = Vec::new();
        if let Some(root) = self.root {
            self.collect_keys(root, &mut out)?;
        }
        Ok(out)
    }

    fn collect_keys(&self, offset: u64, out: &mut Vec<i64>) -> CoreResult<()> {
        let node = self.read_node(offset)?;
        if node.leaf {
            out.extend_from_slice(&node.keys);
            return Ok(());
        }
        for (i, &child) in node.children.iter().enumerate() {
            self.collect_keys(child, out)?;
            if let Some(&key) = node.keys.get(i) {
                out.push(key);
            }
        }
        Ok(())
    }

    /// Every record in the store in file order, including released ones.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be read or decoded.
    pub fn dump(&self) -> CoreResult<Vec<DiskNode>> {
        let size = self.backend.size()?;
        (0..size)
            .step_by(NODE_SIZE)
            .map(|offset| self.read_node(offset))
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Inserts `key`. Returns false if it was already present.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be read or written.
    pub fn insert(&mut self, key: i64) -> CoreResult<bool> {
        if self.contains(key)? {
            return Ok(false);
        }

        match self.root {
            None => {
                let offset = self.allocate()?;
                let mut root = DiskNode::leaf(offset);
                root.keys.push(key);
                self.write_node(&root)?;
                self.root = Some(offset);
                debug!(root = offset, "disk b-tree root created");
            }
            Some(root_offset) => {
                let root = self.read_node(root_offset)?;
                if root.is_full() {
                    let offset = self.allocate()?;
                    let mut new_root = DiskNode::internal(offset, root_offset);
                    self.split_child(&mut new_root, 0, root)?;
                    self.root = Some(offset);
                    debug!(root = offset, "disk b-tree grew a level");
                    self.insert_non_full(new_root, key)?;
                } else {
                    self.insert_non_full(root, key)?;
                }
            }
        }

        self.finish()?;
        Ok(true)
    }

    /// Removes `key`. Returns false if it was not present.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be read or written.
    pub fn remove(&mut self, key: i64) -> CoreResult<bool> {
        let Some(root_offset) = self.root else {
            return Ok(false);
        };

        let root = self.read_node(root_offset)?;
        let removed = self.remove_from(root, key)?;

        let root = self.read_node(root_offset)?;
        if root.is_empty() {
            self.root = root.children.first().copied();
            self.release(root_offset);
            debug!(old = root_offset, new = ?self.root, "disk b-tree root shrank");
        }

        self.finish()?;
        Ok(removed)
    }

    fn insert_non_full(&mut self, mut node: DiskNode, key: i64) -> CoreResult<()> {
        loop {
            let mut i = node.find_key(key);
            if node.leaf {
                node.keys.insert(i, key);
                return self.write_node(&node);
            }

            let mut child = self.read_node(node.children[i])?;
            if child.is_full() {
                self.split_child(&mut node, i, child)?;
                if key > node.keys[i] {
                    i += 1;
                }
                child = self.read_node(node.children[i])?;
            }
            node = child;
        }
    }

    /// Splits the full `child` at position `i` of `parent`. The upper
    /// `T - 1` keys move to a new sibling and the middle key moves up.
    fn split_child(&mut self, parent: &mut DiskNode, i: usize, mut child: DiskNode) -> CoreResult<()> {
        let offset = self.allocate()?;
        let upper = child.keys.split_off(MIN_DEGREE);
        let middle = child
            .keys
            .pop()
            .ok_or_else(|| CoreError::invariant(format!("split of short node @{}", child.offset)))?;
        let sibling = DiskNode {
            offset,
            leaf: child.leaf,
            keys: upper,
            children: if child.leaf {
                Vec::new()
            } else {
                child.children.split_off(MIN_DEGREE)
            },
        };

        parent.keys.insert(i, middle);
        parent.children.insert(i + 1, offset);

        self.write_node(&sibling)?;
        self.write_node(&child)?;
        self.write_node(parent)?;
        debug!(node = child.offset, sibling = offset, middle, "disk b-tree split");
        Ok(())
    }

    fn remove_from(&mut self, mut node: DiskNode, key: i64) -> CoreResult<bool> {
        let idx = node.find_key(key);

        if node.keys.get(idx) == Some(&key) {
            if node.leaf {
                node.keys.remove(idx);
                self.write_node(&node)?;
                return Ok(true);
            }
            return self.remove_from_internal(node, idx);
        }

        if node.leaf {
            return Ok(false);
        }

        let was_last = idx == node.keys.len();
        let child = self.read_node(node.children[idx])?;
        if child.len() < MIN_DEGREE {
            self.fill(&mut node, idx)?;
        }

        // A merge of the last child folds it into its left neighbor.
        let next = if was_last && idx > node.keys.len() {
            node.children[idx - 1]
        } else {
            node.children[idx]
        };
        let child = self.read_node(next)?;
        self.remove_from(child, key)
    }

    fn remove_from_internal(&mut self, mut node: DiskNode, idx: usize) -> CoreResult<bool> {
        let key = node.keys[idx];

        let left = self.read_node(node.children[idx])?;
        if left.len() >= MIN_DEGREE {
            let pred = self.max_key(&left)?;
            node.keys[idx] = pred;
            self.write_node(&node)?;
            return self.remove_from(left, pred);
        }

        let right = self.read_node(node.children[idx + 1])?;
        if right.len() >= MIN_DEGREE {
            let succ = self.min_key(&right)?;
            node.keys[idx] = succ;
            self.write_node(&node)?;
            return self.remove_from(right, succ);
        }

        self.merge(&mut node, idx)?;
        let merged = self.read_node(node.children[idx])?;
        self.remove_from(merged, key)
    }

    /// Brings child `idx` of `parent` up to at least `T` keys.
    fn fill(&mut self, parent: &mut DiskNode, idx: usize) -> CoreResult<()> {
        if idx > 0 {
            let prev = self.read_node(parent.children[idx - 1])?;
            if prev.len() >= MIN_DEGREE {
                return self.borrow_from_prev(parent, idx, prev);
            }
        }
        if idx < parent.keys.len() {
            let next = self.read_node(parent.children[idx + 1])?;
            if next.len() >= MIN_DEGREE {
                return self.borrow_from_next(parent, idx, next);
            }
            return self.merge(parent, idx);
        }
        let prev = idx
            .checked_sub(1)
            .ok_or_else(|| CoreError::invariant(format!("@{} has a single child", parent.offset)))?;
        self.merge(parent, prev)
    }

    fn borrow_from_prev(&mut self, parent: &mut DiskNode, idx: usize, mut sibling: DiskNode) -> CoreResult<()> {
        let mut child = self.read_node(parent.children[idx])?;
        let up = sibling
            .keys
            .pop()
            .ok_or_else(|| CoreError::invariant(format!("borrow from empty @{}", sibling.offset)))?;

        child.keys.insert(0, parent.keys[idx - 1]);
        if !child.leaf {
            let moved = sibling
                .children
                .pop()
                .ok_or_else(|| CoreError::invariant(format!("borrow from childless @{}", sibling.offset)))?;
            child.children.insert(0, moved);
        }
        parent.keys[idx - 1] = up;

        self.write_node(&child)?;
        self.write_node(&sibling)?;
        self.write_node(parent)
    }

    fn borrow_from_next(&mut self, parent: &mut DiskNode, idx: usize, mut sibling: DiskNode) -> CoreResult<()> {
        let mut child = self.read_node(parent.children[idx])?;
        if sibling.keys.is_empty() || (!sibling.leaf && sibling.children.is_empty()) {
            return Err(CoreError::invariant(format!("borrow from empty @{}", sibling.offset)));
        }

        child.keys.push(parent.keys[idx]);
        if !child.leaf {
            child.children.push(sibling.children.remove(0));
        }
        parent.keys[idx] = sibling.keys.remove(0);

        self.write_node(&child)?;
        self.write_node(&sibling)?;
        self.write_node(parent)
    }

    /// Folds child `idx + 1` and the separator between them into child `idx`.
    fn merge(&mut self, parent: &mut DiskNode, idx: usize) -> CoreResult<()> {
        let mut child = self.read_node(parent.children[idx])?;
        let sibling = self.read_node(parent.children[idx + 1])?;

        child.keys.push(parent.keys.remove(idx));
        child.keys.extend_from_slice(&sibling.keys);
        child.children.extend_from_slice(&sibling.children);
        parent.children.remove(idx + 1);

        if child.keys.len() > MAX_KEYS {
            return Err(CoreError::invariant(format!(
                "merge into @{} overflows with {} keys",
                child.offset,
                child.keys.len()
            )));
        }

        self.write_node(&child)?;
        self.write_node(parent)?;
        self.release(sibling.offset);
        debug!(node = child.offset, absorbed = sibling.offset, "disk b-tree merge");
        Ok(())
    }

    fn max_key(&self, node: &DiskNode) -> CoreResult<i64> {
        let mut current = node.clone();
        while !current.leaf {
            let last = *current
                .children
                .last()
                .ok_or_else(|| CoreError::corrupt_node(current.offset, "internal node without children"))?;
            current = self.read_node(last)?;
        }
        current
            .keys
            .last()
            .copied()
            .ok_or_else(|| CoreError::corrupt_node(current.offset, "empty leaf"))
    }

    fn min_key(&self, node: &DiskNode) -> CoreResult<i64> {
        let mut current = node.clone();
        while !current.leaf {
            let first = *current
                .children
                .first()
                .ok_or_else(|| CoreError::corrupt_node(current.offset, "internal node without children"))?;
            current = self.read_node(first)?;
        }
        current
            .keys
            .first()
            .copied()
            .ok_or_else(|| CoreError::corrupt_node(current.offset, "empty leaf"))
    }

    // ------------------------------------------------------------------
    // Record I/O
    // ------------------------------------------------------------------

    fn read_node(&self, offset: u64) -> CoreResult<DiskNode> {
        trace!(offset, "read node");
        let data = self.backend.read_at(offset, NODE_SIZE)?;
        DiskNode::decode(offset, &data)
    }

    fn write_node(&mut self, node: &DiskNode) -> CoreResult<()> {
        trace!(offset = node.offset, keys = node.len(), "write node");
        self.backend.write_at(node.offset, &node.encode())?;
        Ok(())
    }

    /// Returns a record offset, reusing a released one when available.
    /// Fresh offsets are reserved at the end of the store immediately.
    fn allocate(&mut self) -> CoreResult<u64> {
        if let Some(offset) = self.free.pop() {
            trace!(offset, "reuse released record");
            return Ok(offset);
        }
        let offset = self.backend.size()?;
        self.backend.append(&DiskNode::leaf(offset).encode())?;
        Ok(offset)
    }

    fn release(&mut self, offset: u64) {
        self.free.push(offset);
    }

    fn finish(&mut self) -> CoreResult<()> {
        if self.sync_on_write {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Checks key counts, ordering, uniform leaf depth, and that no record
    /// is reachable twice or from the free list.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvariantViolation`] describing the first fault,
    /// or a read error.
    pub fn validate(&self) -> CoreResult<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        let mut seen = Vec::new();
        let mut leaf_depth = None;
        self.validate_node(root, 0, None, None, &mut seen, &mut leaf_depth)
    }

    fn validate_node(
        &self,
        offset: u64,
        depth: usize,
        lower: Option<i64>,
        upper: Option<i64>,
        seen: &mut Vec<u64>,
        leaf_depth: &mut Option<usize>,
    ) -> CoreResult<()> {
        if seen.contains(&offset) || self.free.contains(&offset) {
            return Err(CoreError::invariant(format!("record @{offset} reached twice or released")));
        }
        seen.push(offset);

        let node = self.read_node(offset)?;
        let is_root = Some(offset) == self.root;
        if node.is_empty() || (!is_root && node.len() < MIN_DEGREE - 1) {
            return Err(CoreError::invariant(format!("@{offset} holds {} keys", node.len())));
        }
        if node.keys.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::invariant(format!("@{offset} keys out of order")));
        }
        if node
            .keys
            .iter()
            .any(|&k| lower.is_some_and(|lo| k <= lo) || upper.is_some_and(|hi| k >= hi))
        {
            return Err(CoreError::invariant(format!("@{offset} key outside parent bounds")));
        }

        if node.leaf {
            return match *leaf_depth {
                Some(d) if d != depth => Err(CoreError::invariant(format!(
                    "leaf @{offset} at depth {depth}, expected {d}"
                ))),
                _ => {
                    *leaf_depth = Some(depth);
                    Ok(())
                }
            };
        }

        for (i, &child) in node.children.iter().enumerate() {
            let lo = if i == 0 { lower } else { node.keys.get(i - 1).copied() };
            let hi = node.keys.get(i).copied().or(upper);
            self.validate_node(child, depth + 1, lo, hi, seen, leaf_depth)?;
        }
        Ok(())
    }
}
