//! Disk-resident B-tree.
//!
//! Nodes are fixed-size records in a [`bidms_storage::StorageBackend`],
//! addressed by byte offset. See [`NODE_SIZE`] for the record layout.

mod btree;
mod node;

pub use btree::DiskBTree;
pub use node::{DiskNode, MAX_CHILDREN, MAX_KEYS, MIN_DEGREE, NODE_SIZE};
