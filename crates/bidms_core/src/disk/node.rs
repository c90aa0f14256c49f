//! Fixed-size binary node records.

use crate::error::{CoreError, CoreResult};
use std::fmt;

/// Minimum degree of the disk B-tree.
pub const MIN_DEGREE: usize = 3;

/// Most keys a node can hold.
pub const MAX_KEYS: usize = 2 * MIN_DEGREE - 1;

/// Most children an internal node can hold.
pub const MAX_CHILDREN: usize = 2 * MIN_DEGREE;

/// Encoded record size in bytes.
///
/// Layout, all integers little-endian:
///
/// | field    | size                 |
/// |----------|----------------------|
/// | leaf     | 1 (0 or 1)           |
/// | keys     | `MAX_KEYS` × 8 (i64) |
/// | children | `MAX_CHILDREN` × 8 (i64, −1 = none) |
/// | count    | 8 (i64)              |
pub const NODE_SIZE: usize = 1 + MAX_KEYS * 8 + MAX_CHILDREN * 8 + 8;

const KEYS_AT: usize = 1;
const CHILDREN_AT: usize = KEYS_AT + MAX_KEYS * 8;
const COUNT_AT: usize = CHILDREN_AT + MAX_CHILDREN * 8;
const NO_CHILD: i64 = -1;

/// One node of the disk B-tree, identified by its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskNode {
    pub(crate) offset: u64,
    pub(crate) leaf: bool,
    pub(crate) keys: Vec<i64>,
    /// Empty for leaves, `keys.len() + 1` entries otherwise.
    pub(crate) children: Vec<u64>,
}

impl DiskNode {
    pub(crate) fn leaf(offset: u64) -> Self {
        Self {
            offset,
            leaf: true,
            keys: Vec::with_capacity(MAX_KEYS),
            children: Vec::new(),
        }
    }

    pub(crate) fn internal(offset: u64, first_child: u64) -> Self {
        let mut children = Vec::with_capacity(MAX_CHILDREN);
        children.push(first_child);
        Self {
            offset,
            leaf: false,
            keys: Vec::with_capacity(MAX_KEYS),
            children,
        }
    }

    /// Byte offset of this record in the file.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// True for leaf nodes.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Keys in ascending order.
    #[must_use]
    pub fn keys(&self) -> &[i64] {
        &self.keys
    }

    /// Child offsets; empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[u64] {
        &self.children
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if the node holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.keys.len() >= MAX_KEYS
    }

    /// Index of the first key not less than `key`.
    pub(crate) fn find_key(&self, key: i64) -> usize {
        self.keys.partition_point(|&k| k < key)
    }

    /// Encodes the node as a fixed-size record.
    #[must_use]
    pub fn encode(&self) -> [u8; NODE_SIZE] {
        let mut buf = [0u8; NODE_SIZE];
        buf[0] = u8::from(self.leaf);

        for i in 0..MAX_KEYS {
            let key = self.keys.get(i).copied().unwrap_or(0);
            let at = KEYS_AT + i * 8;
            buf[at..at + 8].copy_from_slice(&key.to_le_bytes());
        }

        for i in 0..MAX_CHILDREN {
            let child = self
                .children
                .get(i)
                .map_or(NO_CHILD, |&c| i64::try_from(c).unwrap_or(NO_CHILD));
            let at = CHILDREN_AT + i * 8;
            buf[at..at + 8].copy_from_slice(&child.to_le_bytes());
        }

        buf[COUNT_AT..].copy_from_slice(&(self.keys.len() as i64).to_le_bytes());
        buf
    }

    /// Decodes a record read from `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptNode`] for a short record, an unknown leaf
    /// flag, an out-of-range key count, or an internal node missing a child.
    pub fn decode(offset: u64, data: &[u8]) -> CoreResult<Self> {
        if data.len() < NODE_SIZE {
            return Err(CoreError::corrupt_node(
                offset,
                format!("record is {} bytes, expected {NODE_SIZE}", data.len()),
            ));
        }

        let leaf = match data[0] {
            0 => false,
            1 => true,
            other => {
                return Err(CoreError::corrupt_node(offset, format!("leaf flag {other}")));
            }
        };

        let count = read_i64(data, COUNT_AT);
        let n = usize::try_from(count)
            .ok()
            .filter(|&n| n <= MAX_KEYS)
            .ok_or_else(|| CoreError::corrupt_node(offset, format!("key count {count}")))?;

        let keys = (0..n).map(|i| read_i64(data, KEYS_AT + i * 8)).collect();

        let children = if leaf {
            Vec::new()
        } else {
            (0..=n)
                .map(|i| {
                    let raw = read_i64(data, CHILDREN_AT + i * 8);
                    u64::try_from(raw).map_err(|_| {
                        CoreError::corrupt_node(offset, format!("child {i} missing"))
                    })
                })
                .collect::<CoreResult<Vec<u64>>>()?
        };

        Ok(Self {
            offset,
            leaf,
            keys,
            children,
        })
    }
}

fn read_i64(data: &[u8], at: usize) -> i64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[at..at + 8]);
    i64::from_le_bytes(raw)
}

impl fmt::Display for DiskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{} {} keys={:?}",
            self.offset,
            if self.leaf { "leaf" } else { "internal" },
            self.keys
        )?;
        if !self.leaf {
            write!(f, " children={:?}", self.children)?;
        }
        Ok(())
    }
}
