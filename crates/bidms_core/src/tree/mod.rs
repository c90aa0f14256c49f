//! In-memory ordered trees.

mod avl;
mod bplus;

pub use avl::{AvlTreeMap, Range};
pub use bplus::{BPlusTree, Iter as BPlusIter};
